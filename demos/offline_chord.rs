//! Render a C major chord offline and log what the engine did.
//!
//! Run with: cargo run --release --example offline_chord
//! Set RUST_LOG=harmonium_dsp=debug for engine internals.

use std::time::Duration;

use harmonium_dsp::{io::midi_note_to_freq, synth::integrator::Integrator, EngineBuilder};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: f64 = 48_000.0;
const BLOCK: usize = 256;
const CHORD: [u8; 3] = [60, 64, 67];

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A short exponentially decaying room
    let room: Vec<f32> = (0..(SAMPLE_RATE as usize / 2))
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            (-t / 0.08).exp() * (1.0 - 2.0 * ((i * 7919) % 97) as f32 / 97.0)
        })
        .collect();

    let (mut engine, mut handle) = EngineBuilder::new()
        .sample_rate(SAMPLE_RATE)
        .block_size(BLOCK)
        .oversample(2)
        .max_polyphony(8)
        .integrator(Integrator::RungeKutta4)
        .impulse_response(room)
        .convolution_mix(0.35)
        .seed(42)
        .build()?;

    let blocks_per_second = (SAMPLE_RATE as usize).div_ceil(BLOCK);
    let mut block = vec![0.0f32; BLOCK];
    let mut rendered = Vec::with_capacity(blocks_per_second * 3 * BLOCK);
    let mut worst = Duration::ZERO;

    for key in CHORD {
        handle.note_on(key, midi_note_to_freq(key))?;
    }
    for n in 0..blocks_per_second * 3 {
        if n == blocks_per_second * 2 {
            for key in CHORD {
                handle.note_off(key)?;
            }
        }
        let status = engine.generate_block(&mut block);
        worst = worst.max(status.elapsed);
        rendered.extend_from_slice(&block);
    }
    handle.log_reports();

    let peak = rendered.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    let rms = (rendered.iter().map(|s| s * s).sum::<f32>() / rendered.len() as f32).sqrt();

    tracing::info!(
        samples = rendered.len(),
        peak,
        rms,
        latency = engine.latency(),
        "chord rendered"
    );
    tracing::info!(
        worst_block_us = worst.as_micros() as u64,
        budget_us = (BLOCK as f64 / SAMPLE_RATE * 1e6) as u64,
        underruns = engine.underruns(),
        faults = engine.faults(),
        "timing"
    );

    Ok(())
}
