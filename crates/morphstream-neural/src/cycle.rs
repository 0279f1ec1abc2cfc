//! One inference cycle: choose a path, compute a window, splice it.
//!
//! All windows and tensors are allocated once in [`MorphCycle::new`] and
//! reused. Nothing here touches a thread or a lock; the worker wraps it.

use crate::backend::{InferenceError, MorphBackend, TensorShape};
use morphstream_core::{is_silent, ControlSnapshot, RingBuffer, StereoSample, StreamConfig};

/// Which computation produced the current output window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePath {
    /// Linear dry/wet blend; the model was not called.
    FastPath,
    Inference,
    /// The model call failed and the linear blend was used instead.
    Fallback,
}

pub struct MorphCycle {
    shape: TensorShape,
    input_samples: usize,
    overlap_samples: usize,
    drop_head_samples: usize,

    source: Box<[StereoSample]>,
    reference: Box<[StereoSample]>,
    output: Box<[StereoSample]>,
    controls: ControlSnapshot,

    tensor_in: Box<[f32]>,
    tensor_out: Box<[f32]>,
}

impl MorphCycle {
    pub fn new(config: &StreamConfig) -> Self {
        let w = config.window_len();
        let shape = TensorShape::for_window(w);
        Self {
            shape,
            input_samples: config.input_samples,
            overlap_samples: config.overlap_samples,
            drop_head_samples: config.drop_head_samples,
            source: vec![StereoSample::SILENCE; w].into_boxed_slice(),
            reference: vec![StereoSample::SILENCE; w].into_boxed_slice(),
            output: vec![StereoSample::SILENCE; w].into_boxed_slice(),
            controls: ControlSnapshot::default(),
            tensor_in: vec![0.0; shape.input_len()].into_boxed_slice(),
            tensor_out: vec![0.0; shape.output_len()].into_boxed_slice(),
        }
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn window_len(&self) -> usize {
        self.shape.length
    }

    /// Copy a request into the cycle's own windows.
    ///
    /// # Panics
    /// If either window is not exactly `window_len()` long.
    pub fn load(
        &mut self,
        source: &[StereoSample],
        reference: &[StereoSample],
        controls: ControlSnapshot,
    ) {
        self.source.copy_from_slice(source);
        self.reference.copy_from_slice(reference);
        self.controls = controls;
    }

    /// Exchange window storage with a request slot instead of copying.
    pub(crate) fn swap_request(
        &mut self,
        source: &mut Box<[StereoSample]>,
        reference: &mut Box<[StereoSample]>,
        controls: ControlSnapshot,
    ) {
        std::mem::swap(&mut self.source, source);
        std::mem::swap(&mut self.reference, reference);
        self.controls = controls;
    }

    pub fn output(&self) -> &[StereoSample] {
        &self.output
    }

    /// Fully dry, fully wet, or silent inputs skip the model.
    pub fn takes_fast_path(&self) -> bool {
        let sum = self.controls.fader_sum();
        sum == 0.0 || sum == 2.0 || (is_silent(&self.source) && is_silent(&self.reference))
    }

    /// Fill the output window for the loaded request.
    pub fn compute(&mut self, backend: &mut dyn MorphBackend) -> CyclePath {
        if self.takes_fast_path() {
            self.linear_blend();
            return CyclePath::FastPath;
        }

        self.assemble_tensor();
        match backend.infer(&self.tensor_in, &mut self.tensor_out) {
            Ok(()) => {
                self.unpack_tensor();
                CyclePath::Inference
            }
            Err(e) => {
                tracing::error!("Morph inference failed, using linear blend: {}", e);
                self.linear_blend();
                CyclePath::Fallback
            }
        }
    }

    fn linear_blend(&mut self) {
        let c = self.controls;
        let weight = c.fader_sum() / 2.0;
        let dry = (1.0 - weight) * c.source_gain;
        let wet = weight * c.reference_gain;

        for ((out, &a), &b) in self
            .output
            .iter_mut()
            .zip(self.source.iter())
            .zip(self.reference.iter())
        {
            *out = a * dry + b * wet;
        }
    }

    fn assemble_tensor(&mut self) {
        let w = self.shape.length;
        let c = self.controls;
        let (src_l, rest) = self.tensor_in.split_at_mut(w);
        let (src_r, rest) = rest.split_at_mut(w);
        let (ref_l, rest) = rest.split_at_mut(w);
        let (ref_r, rest) = rest.split_at_mut(w);
        let (fader_b, fader_a) = rest.split_at_mut(w);

        for (i, s) in self.source.iter().enumerate() {
            src_l[i] = s.l * c.source_gain;
            src_r[i] = s.r * c.source_gain;
        }
        for (i, s) in self.reference.iter().enumerate() {
            ref_l[i] = s.l * c.reference_gain;
            ref_r[i] = s.r * c.reference_gain;
        }
        fader_b.fill(c.morph_b);
        fader_a.fill(c.morph_a);
    }

    fn unpack_tensor(&mut self) {
        let (left, right) = self.tensor_out.split_at(self.shape.length);
        for ((out, &l), &r) in self.output.iter_mut().zip(left).zip(right) {
            *out = StereoSample::new(l, r);
        }
    }

    /// Overlap-add the output window into `ring`: blend `overlap` samples
    /// after the dropped head into the unread tail, then append
    /// `input_samples` new ones.
    ///
    /// If an underrun drained the ring below `overlap`, only the available
    /// tail is blended, against the end of the overlap region.
    ///
    /// # Panics
    /// If `ring` lacks room for `input_samples`.
    pub fn splice_into(&self, ring: &mut RingBuffer) {
        let append_start = self.drop_head_samples + self.overlap_samples;
        let overlap = self.overlap_samples.min(ring.ready());
        if overlap < self.overlap_samples {
            tracing::warn!(
                "Output ring holds {} samples, blending {} of {} overlap",
                ring.ready(),
                overlap,
                self.overlap_samples
            );
        }
        ring.push_overlap_blend(&self.output[append_start - overlap..append_start]);
        ring.push(&self.output[append_start..append_start + self.input_samples]);
    }

    /// Run the model `iterations` times on zeroed input.
    pub fn warmup(
        &mut self,
        backend: &mut dyn MorphBackend,
        iterations: usize,
    ) -> Result<(), InferenceError> {
        self.tensor_in.fill(0.0);
        for _ in 0..iterations {
            backend.infer(&self.tensor_in, &mut self.tensor_out)?;
        }
        Ok(())
    }
}
