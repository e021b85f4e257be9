//! Engine blocks with a growing number of held reeds.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use harmonium_dsp::{synth::integrator::Integrator, Engine, EngineBuilder, EngineHandle};

fn engine(block_size: usize, voices: usize, integrator: Integrator) -> (Engine, EngineHandle) {
    EngineBuilder::new()
        .block_size(block_size)
        .max_polyphony(voices)
        .integrator(integrator)
        .seed(1)
        .build()
        .expect("valid engine config")
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let block_size = 256;

    for voices in [1usize, 4, 8, 16] {
        for integrator in [Integrator::Midpoint, Integrator::RungeKutta4] {
            let (mut engine, mut handle) = engine(block_size, voices, integrator);
            for n in 0..voices {
                let _ = handle.note_on(n as u32, 130.81 * 2f64.powf(n as f64 / 12.0));
            }
            let mut block = vec![0.0f32; block_size];
            engine.generate_block(&mut block);

            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", integrator), voices),
                &voices,
                |b, _| b.iter(|| engine.generate_block(black_box(&mut block))),
            );
        }
    }

    group.finish();
}
