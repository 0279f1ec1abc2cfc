//! Offline morph of two WAV files through the real-time stream path.
//!
//! Feeds both files block by block exactly as a host would, then strips the
//! reported latency so the output lines up with the inputs.
//!
//! ```bash
//! cargo run --example offline_morph -- source.wav reference.wav out.wav 0.5 0.5
//! ```

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use morphstream::prelude::*;
use std::error::Error as StdError;

const BLOCK: usize = 512;

fn read_stereo(path: &str) -> std::result::Result<(Vec<f32>, Vec<f32>, u32), Box<dyn StdError>> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let channels = spec.channels as usize;
    let frames = samples.len() / channels;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in samples.chunks_exact(channels) {
        left.push(frame[0]);
        right.push(if channels > 1 { frame[1] } else { frame[0] });
    }
    Ok((left, right, spec.sample_rate))
}

fn main() -> std::result::Result<(), Box<dyn StdError>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: offline_morph <source.wav> <reference.wav> <out.wav> [morph_a] [morph_b]");
        std::process::exit(2);
    }
    let morph_a: f32 = args.get(4).map(|s| s.parse()).transpose()?.unwrap_or(0.5);
    let morph_b: f32 = args.get(5).map(|s| s.parse()).transpose()?.unwrap_or(0.5);

    let (src_l, src_r, sample_rate) = read_stereo(&args[1])?;
    let (ref_l, ref_r, _) = read_stereo(&args[2])?;

    let mut stream = StreamOrchestrator::builder()
        .backend(CrossfadeBackend::factory())
        .build()?;
    stream.params().set_morph_a(morph_a);
    stream.params().set_morph_b(morph_b);

    // Run past the end by the latency so the tail comes out
    let latency = stream.latency_samples();
    let total = src_l.len().min(ref_l.len());
    let padded = total + latency;
    let sample_at = |v: &[f32], i: usize| v.get(i).copied().unwrap_or(0.0);

    let mut out_l = Vec::with_capacity(padded);
    let mut out_r = Vec::with_capacity(padded);
    let mut block = [[0.0f32; BLOCK]; 6];

    let mut pos = 0;
    while pos < padded {
        let n = BLOCK.min(padded - pos);
        for i in 0..n {
            let t = if pos + i < total { pos + i } else { usize::MAX };
            block[0][i] = sample_at(&src_l, t);
            block[1][i] = sample_at(&src_r, t);
            block[2][i] = sample_at(&ref_l, t);
            block[3][i] = sample_at(&ref_r, t);
        }
        let [sl, sr, rl, rr, ol, or] = &mut block;
        stream.process_planar(&sl[..n], &sr[..n], &rl[..n], &rr[..n], &mut ol[..n], &mut or[..n]);
        out_l.extend_from_slice(&ol[..n]);
        out_r.extend_from_slice(&or[..n]);

        // Offline there is no deadline; keep the worker in lockstep
        stream.wait_for_worker();
        pos += n;
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&args[3], spec)?;
    for i in latency..padded {
        writer.write_sample(out_l[i])?;
        writer.write_sample(out_r[i])?;
    }
    writer.finalize()?;

    let stats = stream.worker_stats();
    println!(
        "Wrote {} frames ({} cycles, {} fast path, {} underruns)",
        padded - latency,
        stats.cycles,
        stats.fast_path_cycles,
        stream.underruns()
    );
    Ok(())
}
