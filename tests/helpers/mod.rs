//! Test helpers and fixtures for morphstream integration tests.
//!
//! Streams are driven offline: one block in, then [`StreamOrchestrator::wait_for_worker`]
//! so every splice lands before the next block. That makes output sample
//! positions exact and lets tests compare against the input shifted by the
//! reported latency.

#![allow(dead_code)]

pub mod tolerances;

use morphstream::prelude::*;

pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Host block used by most tests; equal to `small_config().input_samples`.
pub const TEST_BLOCK: usize = 64;

/// Small valid shapes. `latency_bias = drop_head + overlap`, so the reported
/// latency is exactly the input-to-output alignment.
pub fn small_config() -> StreamConfig {
    StreamConfig {
        input_samples: 64,
        cache_samples: 64,
        overlap_samples: 16,
        drop_head_samples: 32,
        ring_capacity: 512,
        output_delay_samples: 192,
        latency_bias_samples: 48,
        max_block_size: 64,
        warmup_iterations: 1,
    }
}

pub fn test_stream(backend: BackendFactory) -> StreamOrchestrator {
    StreamOrchestrator::builder()
        .config(small_config())
        .backend(backend)
        .build()
        .expect("Failed to build test stream")
}

/// Backend returning the (gain-scaled) source channels unchanged.
pub fn source_passthrough() -> BackendFactory {
    fn_backend_factory("passthrough", |input, output| {
        let n = output.len();
        output.copy_from_slice(&input[..n]);
    })
}

/// Stereo output of a whole offline run.
pub struct Rendered {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

/// Feed `source`/`reference` (mono, duplicated to both channels) through
/// `stream` in `block`-sized planar calls, waiting for the worker after each.
pub fn render(
    stream: &mut StreamOrchestrator,
    source: &[f32],
    reference: &[f32],
    block: usize,
) -> Rendered {
    assert_eq!(source.len(), reference.len());
    let mut left = Vec::with_capacity(source.len());
    let mut right = Vec::with_capacity(source.len());
    let mut out_l = vec![0.0; block];
    let mut out_r = vec![0.0; block];

    for (src, refr) in source.chunks(block).zip(reference.chunks(block)) {
        let n = src.len();
        stream.process_planar(src, src, refr, refr, &mut out_l[..n], &mut out_r[..n]);
        left.extend_from_slice(&out_l[..n]);
        right.extend_from_slice(&out_r[..n]);
        stream.wait_for_worker();
    }
    Rendered { left, right }
}

/// Generate a sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Generate a DC offset signal (constant value).
pub fn generate_dc(value: f32, num_samples: usize) -> Vec<f32> {
    vec![value; num_samples]
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert `actual[i] ≈ expected[i]` for every index, reporting the first miss.
pub fn assert_signals_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len(), "signal length mismatch");
    if let Some((i, (a, e))) = actual
        .iter()
        .zip(expected)
        .enumerate()
        .find(|(_, (a, e))| (*a - *e).abs() > tolerance)
    {
        panic!(
            "Signals differ at sample {}: got {}, expected {} (tolerance {})",
            i, a, e, tolerance
        );
    }
}
