//! Benchmarks for one reed voice under each integrator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use harmonium_dsp::synth::integrator::Integrator;
use harmonium_dsp::synth::message::NoteId;
use harmonium_dsp::synth::voice::{ReedOutput, ReedParams, ReedVoice};

use crate::BLOCK_SIZES;

pub fn bench_reed(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reed");
    let params = ReedParams::default();
    let dt = 1.0 / 96_000.0;

    for &size in BLOCK_SIZES {
        for integrator in Integrator::ALL {
            let mut voice = ReedVoice::with_detune(NoteId(60), 261.63, 0.0, &params);
            let name = format!("{:?}", integrator);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                b.iter(|| {
                    let mut acc = 0.0;
                    for _ in 0..size {
                        if let Ok(out) = voice.step(integrator, dt, black_box(600.0), ReedOutput::Velocity) {
                            acc += out.sample;
                        }
                    }
                    black_box(acc)
                })
            });
        }
    }

    group.finish();
}
