//! Benchmarks for the biquad bank and waveguide body.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use harmonium_dsp::dsp::biquad::{BandPassGain, Biquad};
use harmonium_dsp::dsp::{BodyConfig, BodyResonator};

use crate::BLOCK_SIZES;

pub fn bench_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/body");
    let sample_rate = 96_000.0;

    for &size in BLOCK_SIZES {
        let input: Vec<f64> = (0..size)
            .map(|i| (i as f64 / size as f64) * 2.0 - 1.0)
            .collect();

        let mut biquad = Biquad::band_pass(1200.0, 4.0, sample_rate, BandPassGain::ConstantSkirt);
        group.bench_with_input(BenchmarkId::new("biquad", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0;
                for &x in &input {
                    acc += biquad.process(black_box(x));
                }
                black_box(acc)
            })
        });

        let mut body = BodyResonator::new(&BodyConfig::default(), sample_rate);
        group.bench_with_input(BenchmarkId::new("resonator", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0;
                for &x in &input {
                    acc += body.process(black_box(x));
                }
                black_box(acc)
            })
        });
    }

    group.finish();
}
