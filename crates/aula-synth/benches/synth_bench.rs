//! Criterion benchmarks for aula-synth
//!
//! Run with: cargo bench -p aula-synth
#![allow(missing_docs)]

use aula_core::AudioBuffer;
use aula_synth::{ExponentialFit, ImpulseSynthesizer, SynthesisConfig};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: u32 = 48000;

fn recording(frames: usize) -> AudioBuffer {
    let samples = (0..frames)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE as f32;
            (-t * 3.0).exp() * (n as f32 * 0.613).sin()
        })
        .collect();
    AudioBuffer::mono(SAMPLE_RATE, samples)
}

fn bench_fit(c: &mut Criterion) {
    let values: Vec<f32> = (0..4096).map(|x| (-0.001 * x as f32).exp()).collect();
    c.bench_function("ExponentialFit/4096", |b| {
        b.iter(|| black_box(ExponentialFit::fit(black_box(&values))));
    });
}

fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("ImpulseSynthesizer");
    group.sample_size(10);
    let source = recording(48000);

    for &target in &[65536usize, 131072] {
        let synth = ImpulseSynthesizer::new(SynthesisConfig {
            target_frames: target,
            ..SynthesisConfig::default()
        })
        .unwrap();
        group.bench_with_input(BenchmarkId::new("synthesize", target), &target, |b, _| {
            b.iter(|| black_box(synth.synthesize(Some(&source), None).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_synthesize);

criterion_main!(benches);
