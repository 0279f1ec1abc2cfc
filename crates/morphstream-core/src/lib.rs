//! Real-time buffering primitives for the morphstream engine.
//!
//! # Primary API
//!
//! - [`StereoSample`]: Left/right amplitude pair with elementwise arithmetic
//! - [`RingBuffer`] / [`SharedRingBuffer`]: Fixed-capacity stereo FIFO with
//!   overlap-blend splicing
//! - [`StreamConfig`]: Window sizes, ring capacity, latency reservation
//! - [`MorphParams`] / [`ControlSnapshot`] / [`FaderLink`]: Lock-free control scalars
//!
//! Nothing in this crate spawns threads. The inference side lives in
//! `morphstream-neural`, the real-time driver in the `morphstream` umbrella crate.
//!
//! # Example
//!
//! ```
//! use morphstream_core::{RingBuffer, StereoSample};
//!
//! let mut ring = RingBuffer::new(1024);
//! ring.push(&[StereoSample::new(0.5, -0.5); 64]);
//!
//! let mut out = [StereoSample::SILENCE; 64];
//! ring.read(&mut out, 64);
//! assert_eq!(out[0], StereoSample::new(0.5, -0.5));
//! assert_eq!(ring.ready(), 0);
//! ```

pub mod error;
pub use error::{Error, Result};

mod sample;
pub use sample::{is_silent, StereoSample};

mod ring_buffer;
pub use ring_buffer::{shared_ring_buffer, RingBuffer, SharedRingBuffer};

mod config;
pub use config::StreamConfig;

mod lockfree;
pub use lockfree::{AtomicFlag, AtomicFloat};

mod params;
pub use params::{ControlSnapshot, FaderLink, MorphParams};

