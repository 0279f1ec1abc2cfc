//! Inference backend abstraction.
//!
//! The worker only needs one synchronous call with fixed shapes:
//! a `[1, 6, W]` input tensor in, a `[1, 2, W]` output tensor out, both flat
//! and channel-major. Input channel order:
//!
//! | channel | content |
//! |---|---|
//! | 0, 1 | source left, right (scaled by source gain) |
//! | 2, 3 | reference left, right (scaled by reference gain) |
//! | 4 | morph fader B, broadcast |
//! | 5 | morph fader A, broadcast |
//!
//! Output channels are left, right.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Forward pass failed: {0}")]
    ForwardFailed(String),

    #[error("Backend initialization failed: {0}")]
    BackendInit(String),
}

/// Tensor shapes for one window of `length` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorShape {
    pub input_channels: usize,
    pub output_channels: usize,
    pub length: usize,
}

impl TensorShape {
    pub const INPUT_CHANNELS: usize = 6;
    pub const OUTPUT_CHANNELS: usize = 2;

    pub fn for_window(length: usize) -> Self {
        Self {
            input_channels: Self::INPUT_CHANNELS,
            output_channels: Self::OUTPUT_CHANNELS,
            length,
        }
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.input_channels * self.length
    }

    #[inline]
    pub fn output_len(&self) -> usize {
        self.output_channels * self.length
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[1, {}, {}] -> [1, {}, {}]",
            self.input_channels, self.length, self.output_channels, self.length
        )
    }
}

#[derive(Debug, Clone)]
pub struct BackendCapabilities {
    /// e.g. "ONNX Runtime", "crossfade"
    pub name: String,
    pub has_gpu: bool,
}

/// A morphing model.
///
/// The backend is created on the inference thread by a [`BackendFactory`]
/// and never leaves it, so no `Send` bound is required here.
pub trait MorphBackend {
    /// Run one forward pass. `input.len() == shape().input_len()` and
    /// `output.len() == shape().output_len()` are guaranteed by the worker.
    fn infer(&mut self, input: &[f32], output: &mut [f32]) -> Result<(), InferenceError>;

    fn shape(&self) -> TensorShape;

    fn capabilities(&self) -> BackendCapabilities;
}

/// Builds a backend on the inference thread. Receives the shape the worker
/// will drive it with.
pub type BackendFactory = Box<
    dyn FnOnce(TensorShape) -> Result<Box<dyn MorphBackend>, InferenceError> + Send,
>;

/// Backend wrapping a plain closure.
pub struct FnBackend<F> {
    shape: TensorShape,
    name: String,
    forward: F,
}

impl<F> FnBackend<F>
where
    F: FnMut(&[f32], &mut [f32]),
{
    pub fn new(name: impl Into<String>, shape: TensorShape, forward: F) -> Self {
        Self {
            shape,
            name: name.into(),
            forward,
        }
    }
}

impl<F> MorphBackend for FnBackend<F>
where
    F: FnMut(&[f32], &mut [f32]),
{
    fn infer(&mut self, input: &[f32], output: &mut [f32]) -> Result<(), InferenceError> {
        (self.forward)(input, output);
        Ok(())
    }

    fn shape(&self) -> TensorShape {
        self.shape
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: self.name.clone(),
            has_gpu: false,
        }
    }
}

/// Factory for a closure backend sized to whatever window the worker uses.
pub fn fn_backend_factory<F>(name: impl Into<String>, forward: F) -> BackendFactory
where
    F: FnMut(&[f32], &mut [f32]) + Send + 'static,
{
    let name = name.into();
    Box::new(move |shape| Ok(Box::new(FnBackend::new(name, shape, forward)) as Box<dyn MorphBackend>))
}

/// Stand-in model: mixes source into reference by the mean of the two
/// broadcast fader channels. No learned weights, no warm-up cost.
pub struct CrossfadeBackend {
    shape: TensorShape,
}

impl CrossfadeBackend {
    pub fn new(shape: TensorShape) -> Self {
        Self { shape }
    }

    pub fn factory() -> BackendFactory {
        Box::new(|shape| Ok(Box::new(Self::new(shape)) as Box<dyn MorphBackend>))
    }
}

impl MorphBackend for CrossfadeBackend {
    fn infer(&mut self, input: &[f32], output: &mut [f32]) -> Result<(), InferenceError> {
        let w = self.shape.length;
        let (src, rest) = input.split_at(2 * w);
        let (refr, faders) = rest.split_at(2 * w);
        let (fader_b, fader_a) = faders.split_at(w);

        for ch in 0..2 {
            let out = &mut output[ch * w..(ch + 1) * w];
            let a = &src[ch * w..(ch + 1) * w];
            let b = &refr[ch * w..(ch + 1) * w];
            for i in 0..w {
                let m = 0.5 * (fader_a[i] + fader_b[i]);
                out[i] = a[i] * (1.0 - m) + b[i] * m;
            }
        }
        Ok(())
    }

    fn shape(&self) -> TensorShape {
        self.shape
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "crossfade".into(),
            has_gpu: false,
        }
    }
}
