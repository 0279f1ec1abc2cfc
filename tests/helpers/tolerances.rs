//! Tolerance constants for stream tests.

/// Floating point rounding errors (pass-through, exact gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Crossfade seams: `a * (1 - w) + a * w` is not bit-exact.
pub const BLEND_EPSILON: f32 = 1e-5;

/// Silence threshold (~-80dB).
pub const SILENCE_THRESHOLD: f32 = 0.0001;
