//! Error types for morphstream-core.

use thiserror::Error;

/// Error type for morphstream-core operations.
///
/// Capacity violations on [`RingBuffer`](crate::RingBuffer) are not represented
/// here: they are caller bugs and panic.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
