//! End-to-end stream tests: latency alignment, morph paths, underruns.
//!
//! With `helpers::small_config()` the first worker output sample lands at
//! output index `output_delay_samples` (192) and carries input index
//! `192 - latency` (48). The 16 samples before it are the first overlap
//! blended onto the pre-fill silence.
//!
//! Run with:
//! ```bash
//! cargo test -p morphstream --test stream_tests
//! ```

#[path = "helpers/mod.rs"]
mod helpers;

use approx::assert_abs_diff_eq;
use helpers::tolerances::*;
use helpers::{
    assert_signals_close, assert_silence, generate_dc, generate_silence, generate_sine, render,
    rms, small_config, source_passthrough, test_stream, TEST_BLOCK, TEST_SAMPLE_RATE,
};
use morphstream::prelude::*;
use morphstream::{BackendCapabilities, InferenceError};
use std::time::Duration;

const LEN: usize = 1024;
const DELAY: usize = 192;
const OVERLAP: usize = 16;

/// Expected output from `DELAY` on: `signal` shifted by the reported latency.
fn delayed(signal: &[f32], latency: usize, gain: f32) -> Vec<f32> {
    (DELAY..signal.len())
        .map(|s| signal[s - latency] * gain)
        .collect()
}

/// Backend that rejects every call carrying signal. Warm-up input is all
/// zeros, so the stream still starts.
struct FailOnSignal {
    shape: TensorShape,
}

impl MorphBackend for FailOnSignal {
    fn infer(&mut self, input: &[f32], output: &mut [f32]) -> std::result::Result<(), InferenceError> {
        if input.iter().any(|&v| v != 0.0) {
            return Err(InferenceError::ForwardFailed("device lost".into()));
        }
        output.fill(0.0);
        Ok(())
    }

    fn shape(&self) -> TensorShape {
        self.shape
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "fail-on-signal".into(),
            has_gpu: false,
        }
    }
}

// =============================================================================
// Latency
// =============================================================================

#[test]
fn test_default_config_latency() {
    let stream = StreamOrchestrator::builder()
        .backend(CrossfadeBackend::factory())
        .build()
        .unwrap();

    assert_eq!(stream.latency_samples(), 20480);
    assert_eq!(stream.output_ready(), 24576);
    assert_eq!(stream.config().window_len(), 16384);
}

#[test]
fn test_prefill_is_silent() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    stream.params().set_morph_a(0.5);
    let source = generate_dc(1.0, LEN);
    let out = render(&mut stream, &source, &source, TEST_BLOCK);

    assert_silence(&out.left[..DELAY - OVERLAP], 0.0);
    assert_silence(&out.right[..DELAY - OVERLAP], 0.0);
    assert!(rms(&out.left[DELAY..]) > 0.5);
}

#[test]
fn test_first_overlap_fades_in_from_prefill() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    let latency = stream.latency_samples();
    let source = generate_dc(1.0, LEN);
    let reference = generate_silence(LEN);
    let out = render(&mut stream, &source, &reference, TEST_BLOCK);

    // Faders at zero: dry source, ramped in by i / overlap
    for i in 0..OVERLAP {
        let s = DELAY - OVERLAP + i;
        let expected = source[s - latency] * i as f32 / OVERLAP as f32;
        assert_abs_diff_eq!(out.left[s], expected, epsilon = BLEND_EPSILON);
    }
}

// =============================================================================
// Morph paths
// =============================================================================

#[test]
fn test_dry_output_is_delayed_scaled_source() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    stream.params().set_source_gain(0.5);
    let latency = stream.latency_samples();
    assert_eq!(latency, 144);

    let source = generate_sine(440.0, TEST_SAMPLE_RATE, LEN);
    let reference = generate_dc(0.7, LEN);
    let out = render(&mut stream, &source, &reference, TEST_BLOCK);

    let expected = delayed(&source, latency, 0.5);
    assert_signals_close(&out.left[DELAY..], &expected, BLEND_EPSILON);
    assert_signals_close(&out.right[DELAY..], &expected, BLEND_EPSILON);

    let stats = stream.worker_stats();
    assert!(stats.cycles > 0);
    assert_eq!(stats.fast_path_cycles, stats.cycles);
    assert_eq!(stream.underruns(), 0);
}

#[test]
fn test_wet_output_is_delayed_scaled_reference() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    stream.params().set_morph_a(1.0);
    stream.params().set_morph_b(1.0);
    stream.params().set_reference_gain(0.8);
    let latency = stream.latency_samples();

    let source = generate_dc(0.9, LEN);
    let reference = generate_sine(220.0, TEST_SAMPLE_RATE, LEN);
    let out = render(&mut stream, &source, &reference, TEST_BLOCK);

    let expected = delayed(&reference, latency, 0.8);
    assert_signals_close(&out.left[DELAY..], &expected, BLEND_EPSILON);
    assert_eq!(stream.worker_stats().fast_path_cycles, stream.worker_stats().cycles);
}

#[test]
fn test_inference_output_keeps_alignment() {
    let mut stream = test_stream(source_passthrough());
    stream.params().set_morph_a(0.25);
    stream.params().set_morph_b(0.25);
    stream.params().set_source_gain(0.75);
    let latency = stream.latency_samples();

    let source = generate_sine(1000.0, TEST_SAMPLE_RATE, LEN);
    let reference = generate_sine(300.0, TEST_SAMPLE_RATE, LEN);
    let out = render(&mut stream, &source, &reference, TEST_BLOCK);

    // Gain is applied in the input tensor, so the model sees the scaled source
    let expected = delayed(&source, latency, 0.75);
    assert_signals_close(&out.left[DELAY..], &expected, BLEND_EPSILON);
    assert_signals_close(&out.right[DELAY..], &expected, BLEND_EPSILON);

    let stats = stream.worker_stats();
    assert!(stats.cycles > 0);
    assert_eq!(stats.fast_path_cycles, 0);
    assert_eq!(stats.inference_failures, 0);
}

#[test]
fn test_crossfade_backend_uses_mean_fader() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    stream.params().set_morph_a(0.2);
    stream.params().set_morph_b(0.6);

    let source = generate_dc(1.0, LEN);
    let reference = generate_dc(-1.0, LEN);
    let out = render(&mut stream, &source, &reference, TEST_BLOCK);

    // m = 0.4: 1.0 * 0.6 + -1.0 * 0.4
    let expected = vec![0.2; LEN - DELAY];
    assert_signals_close(&out.left[DELAY..], &expected, BLEND_EPSILON);
    assert_eq!(stream.worker_stats().fast_path_cycles, 0);
}

#[test]
fn test_silent_inputs_skip_inference() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    stream.params().set_morph_a(0.5);
    stream.params().set_morph_b(0.5);

    let silence = generate_silence(LEN);
    let out = render(&mut stream, &silence, &silence, TEST_BLOCK);

    assert_silence(&out.left, SILENCE_THRESHOLD);
    let stats = stream.worker_stats();
    assert!(stats.cycles > 0);
    assert_eq!(stats.fast_path_cycles, stats.cycles);
}

#[test]
fn test_inference_failure_falls_back_to_linear_blend() {
    let backend: BackendFactory =
        Box::new(|shape| Ok(Box::new(FailOnSignal { shape }) as Box<dyn MorphBackend>));
    let mut stream = test_stream(backend);
    stream.params().set_morph_a(0.5);
    stream.params().set_morph_b(0.5);
    let latency = stream.latency_samples();

    let source = generate_sine(440.0, TEST_SAMPLE_RATE, LEN);
    let reference = generate_dc(0.5, LEN);
    let out = render(&mut stream, &source, &reference, TEST_BLOCK);

    // w = 0.5
    let expected: Vec<f32> = (DELAY..LEN)
        .map(|s| 0.5 * source[s - latency] + 0.5 * reference[s - latency])
        .collect();
    assert_signals_close(&out.left[DELAY..], &expected, BLEND_EPSILON);

    let stats = stream.worker_stats();
    assert!(stats.cycles > 0);
    assert_eq!(stats.inference_failures, stats.cycles);
    assert_eq!(stream.underruns(), 0);
}

// =============================================================================
// Block layouts and controls
// =============================================================================

#[test]
fn test_planar_and_interleaved_agree() {
    let mut planar = test_stream(CrossfadeBackend::factory());
    let mut interleaved = test_stream(CrossfadeBackend::factory());
    for stream in [&planar, &interleaved] {
        stream.params().set_morph_a(0.3);
        stream.params().set_morph_b(0.5);
    }

    let src_l = generate_sine(440.0, TEST_SAMPLE_RATE, LEN);
    let src_r = generate_sine(660.0, TEST_SAMPLE_RATE, LEN);
    let ref_l = generate_dc(0.3, LEN);
    let ref_r = generate_sine(220.0, TEST_SAMPLE_RATE, LEN);

    let mut planar_out = Vec::with_capacity(LEN * 2);
    let mut interleaved_out = Vec::with_capacity(LEN * 2);
    let mut out_l = vec![0.0; TEST_BLOCK];
    let mut out_r = vec![0.0; TEST_BLOCK];
    let mut out_i = vec![0.0; TEST_BLOCK * 2];

    for start in (0..LEN).step_by(TEST_BLOCK) {
        let range = start..start + TEST_BLOCK;
        planar.process_planar(
            &src_l[range.clone()],
            &src_r[range.clone()],
            &ref_l[range.clone()],
            &ref_r[range.clone()],
            &mut out_l,
            &mut out_r,
        );
        for i in 0..TEST_BLOCK {
            planar_out.push(out_l[i]);
            planar_out.push(out_r[i]);
        }

        let source: Vec<f32> = range.clone().flat_map(|i| [src_l[i], src_r[i]]).collect();
        let reference: Vec<f32> = range.flat_map(|i| [ref_l[i], ref_r[i]]).collect();
        interleaved.process_interleaved(&source, &reference, &mut out_i);
        interleaved_out.extend_from_slice(&out_i);

        planar.wait_for_worker();
        interleaved.wait_for_worker();
    }

    assert_eq!(planar_out, interleaved_out);
    assert!(rms(&planar_out) > 0.1);
}

#[test]
fn test_fader_link_mirrors_on_next_block() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    let params = Arc::clone(stream.params());
    let block = generate_silence(TEST_BLOCK);
    let mut out_l = vec![0.0; TEST_BLOCK];
    let mut out_r = vec![0.0; TEST_BLOCK];
    let mut step = |stream: &mut StreamOrchestrator| {
        stream.process_planar(&block, &block, &block, &block, &mut out_l, &mut out_r);
    };

    params.set_link(true);
    params.set_morph_a(0.7);
    step(&mut stream);
    assert_eq!(params.morph_b(), 0.7);

    params.set_morph_b(0.2);
    step(&mut stream);
    assert_eq!(params.morph_a(), 0.2);

    // Both moved in one block: A wins
    params.set_morph_a(0.9);
    params.set_morph_b(0.1);
    step(&mut stream);
    assert_eq!(params.morph_a(), 0.9);
    assert_eq!(params.morph_b(), 0.9);

    params.set_link(false);
    params.set_morph_a(0.4);
    step(&mut stream);
    assert_eq!(params.morph_b(), 0.9);
}

#[test]
fn test_shared_params_reach_the_stream() {
    let params = Arc::new(MorphParams::new());
    params.set_morph_a(1.0);
    params.set_morph_b(1.0);

    let mut stream = StreamOrchestrator::builder()
        .config(small_config())
        .params(Arc::clone(&params))
        .backend(CrossfadeBackend::factory())
        .build()
        .unwrap();
    assert!(Arc::ptr_eq(stream.params(), &params));

    let source = generate_dc(1.0, LEN);
    let reference = generate_dc(0.25, LEN);
    let out = render(&mut stream, &source, &reference, TEST_BLOCK);
    let expected = vec![0.25; LEN - DELAY];
    assert_signals_close(&out.left[DELAY..], &expected, FLOAT_EPSILON);
}

// =============================================================================
// Underruns and restart
// =============================================================================

#[test]
fn test_steady_state_has_no_underruns() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    stream.params().set_morph_a(0.5);
    let source = generate_sine(440.0, TEST_SAMPLE_RATE, 8192);
    let reference = generate_sine(550.0, TEST_SAMPLE_RATE, 8192);

    // Smaller host blocks than the inference hop
    render(&mut stream, &source, &reference, 32);
    assert_eq!(stream.underruns(), 0);
    assert!(stream.output_ready() >= OVERLAP);
}

#[test]
fn test_slow_backend_underruns_with_silence() {
    let slow = fn_backend_factory("slow", |input, output| {
        if input.iter().any(|&v| v != 0.0) {
            std::thread::sleep(Duration::from_millis(200));
        }
        output.fill(0.0);
    });
    let mut stream = test_stream(slow);
    stream.params().set_morph_a(0.5);
    let block = generate_dc(1.0, TEST_BLOCK);
    let mut out_l = vec![9.0; TEST_BLOCK];
    let mut out_r = vec![9.0; TEST_BLOCK];

    // Pre-fill covers three blocks; the first cycle is still sleeping
    for _ in 0..4 {
        stream.process_planar(&block, &block, &block, &block, &mut out_l, &mut out_r);
    }
    assert!(stream.underruns() >= 1);
    assert_silence(&out_l, 0.0);
    assert_silence(&out_r, 0.0);

    stream.wait_for_worker();
    stream.prepare();
    assert_eq!(stream.output_ready(), DELAY);
}

#[test]
fn test_stalled_worker_drops_oldest_input() {
    let slow = fn_backend_factory("stalled", |input, output| {
        if input.iter().any(|&v| v != 0.0) {
            std::thread::sleep(Duration::from_millis(300));
        }
        output.fill(0.0);
    });
    let mut stream = test_stream(slow);
    stream.params().set_morph_a(0.5);
    let block = generate_dc(1.0, TEST_BLOCK);
    let mut out_l = vec![9.0; TEST_BLOCK];
    let mut out_r = vec![9.0; TEST_BLOCK];

    // Input rings hold 512: the first cycle takes one hop at block 1, the
    // ring is full after block 8, and blocks 9..12 each drop one block.
    for _ in 0..12 {
        stream.process_planar(&block, &block, &block, &block, &mut out_l, &mut out_r);
    }
    assert_eq!(stream.dropped_input_samples(), 3 * TEST_BLOCK as u64);
    assert_eq!(stream.underruns(), 9);
    assert_silence(&out_l, 0.0);

    // Once the worker catches up the stream submits again
    stream.wait_for_worker();
    assert_eq!(stream.worker_stats().cycles, 1);
    stream.process_planar(&block, &block, &block, &block, &mut out_l, &mut out_r);
    stream.wait_for_worker();
    assert_eq!(stream.worker_stats().cycles, 2);
    assert_eq!(stream.dropped_input_samples(), 4 * TEST_BLOCK as u64);
}

#[test]
fn test_prepare_replays_identically() {
    let mut stream = test_stream(CrossfadeBackend::factory());
    stream.params().set_morph_a(0.4);
    stream.params().set_morph_b(0.4);
    let source = generate_sine(440.0, TEST_SAMPLE_RATE, LEN);
    let reference = generate_sine(880.0, TEST_SAMPLE_RATE, LEN);

    let first = render(&mut stream, &source, &reference, TEST_BLOCK);
    stream.prepare();
    let second = render(&mut stream, &source, &reference, TEST_BLOCK);

    assert_eq!(first.left, second.left);
    assert_eq!(first.right, second.right);
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_build_without_backend_fails() {
    let result = StreamOrchestrator::builder().config(small_config()).build();
    assert!(matches!(
        result,
        Err(Error::Core(morphstream::core::Error::InvalidConfig(_)))
    ));
}

#[test]
fn test_build_rejects_invalid_config() {
    let config = StreamConfig {
        overlap_samples: 256,
        ..small_config()
    };
    let result = StreamOrchestrator::builder()
        .config(config)
        .backend(CrossfadeBackend::factory())
        .build();
    assert!(matches!(result, Err(Error::Core(_))));
}

#[test]
fn test_backend_init_failure_surfaces() {
    let backend: BackendFactory =
        Box::new(|_| Err(InferenceError::BackendInit("model file missing".into())));
    let result = StreamOrchestrator::builder()
        .config(small_config())
        .backend(backend)
        .build();
    assert!(matches!(result, Err(Error::Neural(_))));
}
