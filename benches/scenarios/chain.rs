//! Full chain: chord, body, convolution and 4x oversampling.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use harmonium_dsp::EngineBuilder;

use crate::BLOCK_SIZES;

pub fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chain");
    let ir: Vec<f32> = (0..12_000).map(|i| (-(i as f32) / 2_000.0).exp()).collect();

    for &size in BLOCK_SIZES {
        let (mut engine, mut handle) = EngineBuilder::new()
            .block_size(size)
            .oversample(4)
            .impulse_response(ir.clone())
            .convolution_mix(0.3)
            .seed(1)
            .build()
            .expect("valid engine config");
        for (id, freq) in [(60u8, 261.63), (64, 329.63), (67, 392.0)] {
            let _ = handle.note_on(id, freq);
        }
        let mut block = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("triad_x4_conv", size), &size, |b, _| {
            b.iter(|| engine.generate_block(black_box(&mut block)))
        });
    }

    group.finish();
}
