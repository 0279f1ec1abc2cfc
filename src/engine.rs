//! Real-time stream driver: one call per host audio block.

use crate::StreamOrchestratorBuilder;
use morphstream_core::{
    shared_ring_buffer, FaderLink, MorphParams, RingBuffer, SharedRingBuffer, StereoSample,
    StreamConfig,
};
use morphstream_neural::{InferenceWorker, SubmitError, WorkerStats};
use std::sync::Arc;

/// Drives one morph stream from the audio callback.
///
/// Owns the source and reference input rings, the output ring shared with the
/// [`InferenceWorker`], and the reusable windows handed to it. Per block:
///
/// 1. push the new input into both input rings
/// 2. apply fader link
/// 3. if a full cycle of new input exists and the worker is idle, read one
///    window (consuming only `input_samples`, keeping the cache as lookahead)
///    and submit it
/// 4. drain exactly one block from the output ring
///
/// The output ring is pre-filled with `output_delay_samples` of silence by
/// [`prepare`](Self::prepare), so inference normally stays ahead of the
/// reader. If it does not, the missing tail of the block is silence. If the
/// worker stalls long enough for the input rings to fill, the oldest input is
/// dropped to make room for the new block.
///
/// Nothing on the per-block path allocates or waits on the worker.
///
/// # Example
///
/// ```ignore
/// use morphstream::prelude::*;
///
/// let mut stream = StreamOrchestrator::builder()
///     .backend(CrossfadeBackend::factory())
///     .build()?;
///
/// host.set_latency(stream.latency_samples());
///
/// // In the audio callback
/// stream.process_planar(&src_l, &src_r, &ref_l, &ref_r, &mut out_l, &mut out_r);
/// ```
pub struct StreamOrchestrator {
    config: StreamConfig,
    params: Arc<MorphParams>,
    link: FaderLink,

    source_input: RingBuffer,
    reference_input: RingBuffer,
    output: SharedRingBuffer,
    worker: InferenceWorker,

    source_window: Box<[StereoSample]>,
    reference_window: Box<[StereoSample]>,

    /// Input samples received since the last submitted cycle.
    new_samples: usize,
    underruns: u64,
    in_underrun: bool,
    dropped_input: u64,
    in_overflow: bool,
}

impl StreamOrchestrator {
    pub fn builder() -> StreamOrchestratorBuilder {
        StreamOrchestratorBuilder::default()
    }

    /// `config` must already be validated and match the worker's.
    pub(crate) fn new(
        config: StreamConfig,
        params: Arc<MorphParams>,
        worker: InferenceWorker,
    ) -> Self {
        let w = config.window_len();
        let mut stream = Self {
            link: FaderLink::new(&params),
            source_input: RingBuffer::new(config.ring_capacity),
            reference_input: RingBuffer::new(config.ring_capacity),
            output: shared_ring_buffer(config.ring_capacity),
            worker,
            source_window: vec![StereoSample::SILENCE; w].into_boxed_slice(),
            reference_window: vec![StereoSample::SILENCE; w].into_boxed_slice(),
            new_samples: 0,
            underruns: 0,
            in_underrun: false,
            dropped_input: 0,
            in_overflow: false,
            config,
            params,
        };
        stream.prepare();
        stream
    }

    /// Reset for playback (re)start.
    ///
    /// Waits for any in-flight inference to land, so a stale splice can't
    /// follow the reset. Call from the host's prepare hook, not the audio
    /// callback.
    pub fn prepare(&mut self) {
        self.worker.wait_idle();

        self.source_input.reset();
        self.reference_input.reset();
        {
            let mut output = self.output.lock();
            output.reset();
            output.fill_silence(self.config.output_delay_samples);
        }
        self.new_samples = 0;
        self.in_underrun = false;
        self.in_overflow = false;
        self.link.reset(&self.params);
    }

    /// Latency to report to the host.
    pub fn latency_samples(&self) -> usize {
        self.config.reported_latency()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Shared control block. Clone the `Arc` into the UI/automation side.
    pub fn params(&self) -> &Arc<MorphParams> {
        &self.params
    }

    /// Blocks that could not be filled completely from the output ring.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    /// Input samples discarded because the worker fell too far behind.
    pub fn dropped_input_samples(&self) -> u64 {
        self.dropped_input
    }

    pub fn output_ready(&self) -> usize {
        self.output.lock().ready()
    }

    pub fn is_worker_busy(&self) -> bool {
        self.worker.is_busy()
    }

    pub fn worker_stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    /// Block until the worker has no request in flight. For offline use and
    /// tests; never call from the audio callback.
    pub fn wait_for_worker(&self) {
        self.worker.wait_idle();
    }

    /// Process one block of planar stereo.
    ///
    /// # Panics
    /// If channel slices differ in length or exceed `max_block_size`.
    pub fn process_planar(
        &mut self,
        source_l: &[f32],
        source_r: &[f32],
        reference_l: &[f32],
        reference_r: &[f32],
        out_l: &mut [f32],
        out_r: &mut [f32],
    ) {
        let n = source_l.len();
        self.check_block(n);
        assert!(
            [source_r.len(), reference_l.len(), reference_r.len(), out_l.len(), out_r.len()]
                .iter()
                .all(|&len| len == n),
            "planar block channel length mismatch"
        );

        self.make_room(n);
        self.source_input.push_planar(source_l, source_r);
        self.reference_input.push_planar(reference_l, reference_r);
        self.new_samples += n;

        self.link.apply(&self.params);
        self.maybe_submit();

        let available = {
            let mut output = self.output.lock();
            let available = output.ready().min(n);
            output.read_planar(&mut out_l[..available], &mut out_r[..available], available);
            available
        };
        if available < n {
            out_l[available..].fill(0.0);
            out_r[available..].fill(0.0);
        }
        self.note_drain(available, n);
    }

    /// Process one block of interleaved `[l, r, l, r, ...]` stereo.
    ///
    /// # Panics
    /// If the buffers differ in length, have an odd length, or exceed
    /// `max_block_size` frames.
    pub fn process_interleaved(&mut self, source: &[f32], reference: &[f32], output: &mut [f32]) {
        assert!(
            source.len() == reference.len() && source.len() == output.len(),
            "interleaved block length mismatch"
        );
        let n = source.len() / 2;
        self.check_block(n);

        self.make_room(n);
        self.source_input.push_interleaved(source);
        self.reference_input.push_interleaved(reference);
        self.new_samples += n;

        self.link.apply(&self.params);
        self.maybe_submit();

        let available = {
            let mut ring = self.output.lock();
            let available = ring.ready().min(n);
            ring.read_interleaved(&mut output[..available * 2], available);
            available
        };
        output[available * 2..].fill(0.0);
        self.note_drain(available, n);
    }

    #[inline]
    fn check_block(&self, n: usize) {
        assert!(
            n <= self.config.max_block_size,
            "block of {} samples exceeds max_block_size {}",
            n,
            self.config.max_block_size
        );
    }

    /// Drop the oldest input so a block of `n` fits. Both input rings always
    /// hold the same count.
    fn make_room(&mut self, n: usize) {
        let free = self.source_input.free_space();
        if free >= n {
            self.in_overflow = false;
            return;
        }

        let surplus = n - free;
        self.source_input.skip(surplus);
        self.reference_input.skip(surplus);
        self.new_samples = self.new_samples.saturating_sub(surplus);
        self.dropped_input += surplus as u64;

        if !self.in_overflow {
            self.in_overflow = true;
            tracing::warn!(
                "Input overrun: inference worker behind, dropping {} oldest samples",
                surplus
            );
        }
    }

    fn maybe_submit(&mut self) {
        let input = self.config.input_samples;
        if self.new_samples < input
            || self.source_input.ready() < self.config.window_len()
            || self.worker.is_busy()
        {
            return;
        }

        self.source_input.read(&mut self.source_window, input);
        self.reference_input.read(&mut self.reference_window, input);
        self.new_samples -= input;

        // Only a stopped worker refuses here. The window is already consumed
        // so the input rings keep draining; the lost output shows up as underrun.
        if let Err(e) = self.worker.submit(
            &self.source_window,
            &self.reference_window,
            self.params.snapshot(),
            &self.output,
        ) {
            debug_assert_eq!(e, SubmitError::Stopped);
        }
    }

    fn note_drain(&mut self, available: usize, wanted: usize) {
        if available == wanted {
            self.in_underrun = false;
            return;
        }
        self.underruns += 1;
        if !self.in_underrun {
            self.in_underrun = true;
            tracing::warn!(
                "Output underrun: {} of {} samples ready, padding with silence",
                available,
                wanted
            );
        }
    }
}
