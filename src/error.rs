//! Centralized error type for the morphstream umbrella crate.
//!
//! Wraps subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] morphstream_core::Error),

    #[error("Neural: {0}")]
    Neural(#[from] morphstream_neural::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
