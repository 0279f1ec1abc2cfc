//! Error types for the inference worker.

use crate::backend::{InferenceError, TensorShape};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Stream configuration error: {0}")]
    Core(#[from] morphstream_core::Error),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Backend tensor shape {actual} does not match expected {expected}")]
    ShapeMismatch {
        expected: TensorShape,
        actual: TensorShape,
    },

    #[error("Failed to spawn inference thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Inference thread disconnected during init")]
    WorkerInit,
}

/// Why [`InferenceWorker::submit`](crate::InferenceWorker::submit) refused a request.
///
/// None of these allocate, so the audio thread can construct and drop them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Inference worker is busy")]
    Busy,

    #[error("Window length {actual} does not match configured {expected}")]
    WindowLength { expected: usize, actual: usize },

    #[error("Inference worker has stopped")]
    Stopped,
}
