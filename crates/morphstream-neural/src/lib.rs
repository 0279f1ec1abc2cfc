//! Background inference for morphstream.
//!
//! The [`InferenceWorker`] owns one dedicated thread and a set of reusable
//! windows. Each request either takes a linear dry/wet fast path or runs the
//! [`MorphBackend`] once, then overlap-splices the result into a
//! [`SharedRingBuffer`](morphstream_core::SharedRingBuffer).
//!
//! This crate binds no ML framework. Supply a [`BackendFactory`] wrapping
//! ONNX Runtime, candle, or anything that maps a `[1, 6, W]` tensor to
//! `[1, 2, W]`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use morphstream_core::{shared_ring_buffer, ControlSnapshot, StreamConfig};
//! use morphstream_neural::{CrossfadeBackend, InferenceWorker};
//!
//! let config = StreamConfig::default();
//! let worker = InferenceWorker::start(&config, CrossfadeBackend::factory())?;
//! let output = shared_ring_buffer(config.ring_capacity);
//!
//! if !worker.is_busy() {
//!     worker.submit(&source_window, &reference_window, ControlSnapshot::default(), &output)?;
//! }
//! ```

mod error;
pub use error::{Error, Result, SubmitError};

mod backend;
pub use backend::{
    fn_backend_factory, BackendCapabilities, BackendFactory, CrossfadeBackend, FnBackend,
    InferenceError, MorphBackend, TensorShape,
};

mod cycle;
pub use cycle::{CyclePath, MorphCycle};

mod worker;
pub use worker::{InferenceWorker, WorkerStats};
