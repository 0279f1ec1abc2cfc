//! Fixed-capacity stereo ring buffer with overlap-blend splicing.
//!
//! Cursors advance monotonically (wrapping at `usize::MAX`) and are masked
//! into the backing storage, so occupancy is always `write - read`.
//!
//! Capacity violations (pushing more than [`RingBuffer::free_space`], reading
//! more than [`RingBuffer::ready`]) panic. They mean the caller failed to
//! throttle, and truncating silently would shift the timeline.

use crate::sample::StereoSample;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::Arc;

/// Output ring shared between the inference worker (writer) and the audio
/// callback (reader). Every access holds the lock for one push or read only.
pub type SharedRingBuffer = Arc<Mutex<RingBuffer>>;

/// Create a [`SharedRingBuffer`] of the given capacity.
pub fn shared_ring_buffer(capacity: usize) -> SharedRingBuffer {
    Arc::new(Mutex::new(RingBuffer::new(capacity)))
}

pub struct RingBuffer {
    buffer: Box<[StereoSample]>,
    mask: usize,
    write_pos: usize,
    read_pos: usize,
}

impl RingBuffer {
    /// # Panics
    /// If `capacity` is not a power of two.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "ring capacity {} is not a power of two",
            capacity
        );
        Self {
            buffer: vec![StereoSample::SILENCE; capacity].into_boxed_slice(),
            mask: capacity - 1,
            write_pos: 0,
            read_pos: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Samples written but not yet consumed.
    #[inline]
    pub fn ready(&self) -> usize {
        self.write_pos.wrapping_sub(self.read_pos)
    }

    #[inline]
    pub fn free_space(&self) -> usize {
        self.capacity() - self.ready()
    }

    /// Zero both cursors. Contents are left in place and are unreachable
    /// until overwritten.
    pub fn reset(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
    }

    /// Split `n` slots starting at cursor `pos` into at most two contiguous
    /// ranges of the backing storage.
    #[inline]
    fn regions(&self, pos: usize, n: usize) -> (Range<usize>, Range<usize>) {
        let start = pos & self.mask;
        let first = n.min(self.capacity() - start);
        (start..start + first, 0..n - first)
    }

    #[inline]
    fn check_push(&self, n: usize) {
        assert!(
            n <= self.free_space(),
            "ring push of {} samples exceeds free space {}",
            n,
            self.free_space()
        );
    }

    #[inline]
    fn check_read(&self, peek: usize, consume: usize) {
        assert!(
            peek <= self.ready(),
            "ring read of {} samples exceeds ready count {}",
            peek,
            self.ready()
        );
        assert!(
            consume <= peek,
            "ring read consumes {} but only peeks {}",
            consume,
            peek
        );
    }

    /// Append `samples` at the write cursor.
    pub fn push(&mut self, samples: &[StereoSample]) {
        let n = samples.len();
        self.check_push(n);

        let (a, b) = self.regions(self.write_pos, n);
        let split = a.len();
        self.buffer[a].copy_from_slice(&samples[..split]);
        self.buffer[b].copy_from_slice(&samples[split..]);
        self.write_pos = self.write_pos.wrapping_add(n);
    }

    /// Append separate left/right channel arrays of equal length.
    pub fn push_planar(&mut self, left: &[f32], right: &[f32]) {
        assert_eq!(left.len(), right.len(), "planar channel length mismatch");
        let n = left.len();
        self.check_push(n);

        let (a, b) = self.regions(self.write_pos, n);
        let split = a.len();
        for (dst, (&l, &r)) in self.buffer[a]
            .iter_mut()
            .zip(left[..split].iter().zip(&right[..split]))
        {
            *dst = StereoSample::new(l, r);
        }
        for (dst, (&l, &r)) in self.buffer[b]
            .iter_mut()
            .zip(left[split..].iter().zip(&right[split..]))
        {
            *dst = StereoSample::new(l, r);
        }
        self.write_pos = self.write_pos.wrapping_add(n);
    }

    /// Append interleaved `[l0, r0, l1, r1, ...]` frames.
    pub fn push_interleaved(&mut self, frames: &[f32]) {
        assert!(frames.len() % 2 == 0, "interleaved stereo needs an even length");
        let n = frames.len() / 2;
        self.check_push(n);

        let (a, b) = self.regions(self.write_pos, n);
        let split = a.len();
        for (dst, pair) in self.buffer[a].iter_mut().zip(frames[..split * 2].chunks_exact(2)) {
            *dst = StereoSample::new(pair[0], pair[1]);
        }
        for (dst, pair) in self.buffer[b].iter_mut().zip(frames[split * 2..].chunks_exact(2)) {
            *dst = StereoSample::new(pair[0], pair[1]);
        }
        self.write_pos = self.write_pos.wrapping_add(n);
    }

    /// Append `n` samples of silence.
    pub fn fill_silence(&mut self, n: usize) {
        self.check_push(n);

        let (a, b) = self.regions(self.write_pos, n);
        self.buffer[a].fill(StereoSample::SILENCE);
        self.buffer[b].fill(StereoSample::SILENCE);
        self.write_pos = self.write_pos.wrapping_add(n);
    }

    /// Crossfade `samples` into the most recently written, still unread tail.
    ///
    /// Position `i` of the `n`-sample tail becomes
    /// `existing * (1 - i/n) + new * (i/n)`. Cursors do not move.
    ///
    /// # Panics
    /// If `samples.len() > self.ready()`.
    pub fn push_overlap_blend(&mut self, samples: &[StereoSample]) {
        let n = samples.len();
        assert!(
            n <= self.ready(),
            "overlap blend of {} samples exceeds ready count {}",
            n,
            self.ready()
        );
        if n == 0 {
            return;
        }

        let start = self.write_pos.wrapping_sub(n);
        let (a, b) = self.regions(start, n);
        let split = a.len();
        let inv_n = 1.0 / n as f32;

        let blend = |offset: usize, dst: &mut [StereoSample], src: &[StereoSample]| {
            for (i, (existing, &new)) in dst.iter_mut().zip(src).enumerate() {
                let weight = (offset + i) as f32 * inv_n;
                *existing = *existing * (1.0 - weight) + new * weight;
            }
        };
        blend(0, &mut self.buffer[a], &samples[..split]);
        blend(split, &mut self.buffer[b], &samples[split..]);
    }

    /// Copy `dest.len()` samples from the read cursor, then consume `consume`
    /// of them.
    pub fn read(&mut self, dest: &mut [StereoSample], consume: usize) {
        let n = dest.len();
        self.check_read(n, consume);

        let (a, b) = self.regions(self.read_pos, n);
        let split = a.len();
        dest[..split].copy_from_slice(&self.buffer[a]);
        dest[split..].copy_from_slice(&self.buffer[b]);
        self.read_pos = self.read_pos.wrapping_add(consume);
    }

    /// Consume `n` samples from the read cursor without copying them.
    pub fn skip(&mut self, n: usize) {
        self.check_read(n, n);
        self.read_pos = self.read_pos.wrapping_add(n);
    }

    /// Planar variant of [`read`](Self::read).
    pub fn read_planar(&mut self, left: &mut [f32], right: &mut [f32], consume: usize) {
        assert_eq!(left.len(), right.len(), "planar channel length mismatch");
        let n = left.len();
        self.check_read(n, consume);

        let (a, b) = self.regions(self.read_pos, n);
        let split = a.len();
        let (left_a, left_b) = left.split_at_mut(split);
        let (right_a, right_b) = right.split_at_mut(split);
        for ((l, r), s) in left_a.iter_mut().zip(right_a.iter_mut()).zip(&self.buffer[a]) {
            *l = s.l;
            *r = s.r;
        }
        for ((l, r), s) in left_b.iter_mut().zip(right_b.iter_mut()).zip(&self.buffer[b]) {
            *l = s.l;
            *r = s.r;
        }
        self.read_pos = self.read_pos.wrapping_add(consume);
    }

    /// Interleaved variant of [`read`](Self::read). `consume` counts frames.
    pub fn read_interleaved(&mut self, frames: &mut [f32], consume: usize) {
        assert!(frames.len() % 2 == 0, "interleaved stereo needs an even length");
        let n = frames.len() / 2;
        self.check_read(n, consume);

        let (a, b) = self.regions(self.read_pos, n);
        let split = a.len();
        let (head, tail) = frames.split_at_mut(split * 2);
        for (pair, s) in head.chunks_exact_mut(2).zip(&self.buffer[a]) {
            pair[0] = s.l;
            pair[1] = s.r;
        }
        for (pair, s) in tail.chunks_exact_mut(2).zip(&self.buffer[b]) {
            pair[0] = s.l;
            pair[1] = s.r;
        }
        self.read_pos = self.read_pos.wrapping_add(consume);
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("ready", &self.ready())
            .finish()
    }
}
