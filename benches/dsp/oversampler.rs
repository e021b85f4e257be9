//! Benchmarks for polyphase up/down sampling.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use harmonium_dsp::dsp::oversampler::Oversampler;

use crate::BLOCK_SIZES;

pub fn bench_oversampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oversampler");

    for &size in BLOCK_SIZES {
        for factor in [2usize, 4] {
            let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin()).collect();
            let mut high = vec![0.0f32; size * factor];
            let mut low = vec![0.0f32; size];

            let mut os = Oversampler::new(factor, 32).expect("valid factor");
            group.bench_with_input(
                BenchmarkId::new(format!("round_trip_x{factor}"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        os.upsample_into(black_box(&input), &mut high);
                        os.downsample_into(&high, black_box(&mut low));
                    })
                },
            );
        }
    }

    group.finish();
}
