//! # morphstream - Real-time Neural Audio Morphing Core
//!
//! Streams a source and a reference stereo signal through a neural morphing
//! model and returns one continuous stereo output with fixed, reported latency.
//!
//! ## Architecture
//!
//! morphstream is an umbrella crate that coordinates:
//! - **morphstream-core** - Stereo ring buffer with overlap-blend splicing,
//!   stream configuration, lock-free control parameters
//! - **morphstream-neural** - Background inference worker, backend
//!   abstraction, linear-blend fast path
//!
//! The [`StreamOrchestrator`] is called once per host block from the audio
//! thread. It never blocks on inference: a window is handed to the worker when
//! enough input has accumulated, and the output ring, pre-filled with the
//! latency reservation, is drained one block at a time.
//!
//! ## Quick Start
//!
//! ```ignore
//! use morphstream::prelude::*;
//!
//! let mut stream = StreamOrchestrator::builder()
//!     .backend(CrossfadeBackend::factory())
//!     .build()?;
//!
//! stream.params().set_morph_a(0.4);
//! stream.params().set_morph_b(0.7);
//!
//! // Audio callback
//! stream.process_planar(&src_l, &src_r, &ref_l, &ref_r, &mut out_l, &mut out_r);
//! ```

/// Re-export of morphstream-core for direct access
pub use morphstream_core as core;

/// Re-export of morphstream-neural for direct access
pub use morphstream_neural as neural;

pub use morphstream_core::{
    shared_ring_buffer, ControlSnapshot, FaderLink, MorphParams, RingBuffer, SharedRingBuffer,
    StereoSample, StreamConfig,
};

pub use morphstream_neural::{
    fn_backend_factory, BackendCapabilities, BackendFactory, CrossfadeBackend, FnBackend,
    InferenceError, InferenceWorker, MorphBackend, SubmitError, TensorShape, WorkerStats,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::StreamOrchestratorBuilder;
pub use engine::StreamOrchestrator;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        fn_backend_factory, BackendFactory, ControlSnapshot, CrossfadeBackend, MorphBackend,
        MorphParams, StereoSample, StreamConfig, StreamOrchestrator, TensorShape,
    };
    pub use crate::{Error, Result};
    pub use std::sync::Arc;
}
