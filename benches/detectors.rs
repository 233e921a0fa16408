//! Benchmarks `Detector::update` throughput for each variant over a
//! synthetic multi-flow stream, the way a streaming sketch's per-packet
//! cost is usually reported.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use jitter_sketch::detector::{DelaySketch, Detector, FDFilter, JitterSketch, JitterSketchS1Opt};
use jitter_sketch::event::{JitterDetectionMode, JitterParams};
use jitter_sketch::flowkey::FlowKey;
use jitter_sketch::hash::AwareHash;

const NUM_FLOWS: u32 = 256;
const PACKETS_PER_FLOW: u64 = 64;

fn params() -> JitterParams {
    JitterParams {
        jitter_factor: 2.0,
        min_absolute_jitter_thres: 500,
        max_ifpd_diff: 1_000_000,
        jitter_detection_mode: JitterDetectionMode::Either,
        frequency_threshold: 30,
    }
}

fn synthetic_stream() -> Vec<(FlowKey, u64)> {
    let mut stream = Vec::with_capacity((NUM_FLOWS as u64 * PACKETS_PER_FLOW) as usize);
    for flow in 0..NUM_FLOWS {
        let key = FlowKey::new(flow, flow.wrapping_mul(7), (flow % 1024) as u16, 443, 6);
        for p in 0..PACKETS_PER_FLOW {
            stream.push((key, p * 1_000 + flow as u64));
        }
    }
    stream.sort_by_key(|(_, ts)| *ts);
    stream
}

fn bench_fdfilter(c: &mut Criterion) {
    let stream = synthetic_stream();
    c.bench_function("fdfilter_update", |b| {
        b.iter(|| {
            let mut d = FDFilter::<AwareHash>::new(
                3, 4, 8192, 3, 8192, 3, 2_000_000, params(), 4096, 1024, 4,
            );
            for (key, ts) in &stream {
                black_box(d.update(key, *ts));
            }
        });
    });
}

fn bench_delay_sketch(c: &mut Criterion) {
    let stream = synthetic_stream();
    c.bench_function("delay_sketch_update", |b| {
        b.iter(|| {
            let mut d = DelaySketch::<AwareHash>::new(4, 4096, params(), 4096, 1024, 4);
            for (key, ts) in &stream {
                black_box(d.update(key, *ts));
            }
        });
    });
}

fn bench_jitter_sketch(c: &mut Criterion) {
    let stream = synthetic_stream();
    c.bench_function("jitter_sketch_update", |b| {
        b.iter(|| {
            let mut d = JitterSketch::new(1024, 1024, 256, 4, params());
            for (key, ts) in &stream {
                black_box(d.update(key, *ts));
            }
        });
    });
}

fn bench_jitter_sketch_s1opt(c: &mut Criterion) {
    let stream = synthetic_stream();
    c.bench_function("jitter_sketch_s1opt_update", |b| {
        b.iter(|| {
            let mut d = JitterSketchS1Opt::new(1024, 1024, 256, 4, 4, params());
            for (key, ts) in &stream {
                black_box(d.update(key, *ts));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_fdfilter,
    bench_delay_sketch,
    bench_jitter_sketch,
    bench_jitter_sketch_s1opt
);
criterion_main!(benches);
