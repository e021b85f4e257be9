//! Benchmarks for partitioned convolution against a one second response.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use harmonium_dsp::dsp::convolver::PartitionedConvolver;

use crate::BLOCK_SIZES;

pub fn bench_convolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/convolver");
    let ir: Vec<f32> = (0..48_000)
        .map(|i| (-(i as f32) / 8_000.0).exp() * if i % 3 == 0 { 0.5 } else { -0.25 })
        .collect();

    for &size in BLOCK_SIZES {
        let mut conv = PartitionedConvolver::new(&ir, size).expect("non-empty ir");
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut block = input.clone();

        group.bench_with_input(BenchmarkId::new("1s_ir", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                conv.process(black_box(&mut block));
            })
        });
    }

    group.finish();
}
