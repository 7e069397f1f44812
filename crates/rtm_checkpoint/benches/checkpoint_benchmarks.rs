//! Criterion benchmarks for rtm_checkpoint.
//!
//! Benchmarks cover:
//! - Frame codec throughput at several tolerances
//! - Chunk encoding across codec worker counts
//! - Full forward/backward replay in full-fit, raw spill and compressed spill modes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rtm_checkpoint::{
    CodecContext, CollectorConfig, CompressionParameters, ForwardCollector, FrameCodec,
    QuantizingCodec,
};
use rtm_core::grid::GridBox;
use rtm_core::types::{CellDimensions, GridSize, WindowSize};

const WINDOW: WindowSize = WindowSize::new(256, 1, 256);

/// Smooth synthetic wavefield frame.
fn wavefield(t: usize) -> Vec<f32> {
    let phase = t as f32 * 0.05;
    (0..WINDOW.sample_count())
        .map(|i| {
            let x = (i % WINDOW.nx) as f32 * 0.03;
            let z = (i / WINDOW.nx) as f32 * 0.02;
            (x + phase).sin() * (z - phase).cos()
        })
        .collect()
}

/// Benchmark single-frame encode and decode.
fn bench_frame_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_codec");
    let frame = wavefield(10);

    for tolerance in [1e-2f32, 1e-4, 1e-6] {
        let params = CompressionParameters::new(tolerance, 1, false).unwrap();
        let codec = QuantizingCodec::new(params);
        let blob = codec.compress(&frame, WINDOW, 0).unwrap();
        let mut out = vec![0.0; frame.len()];

        group.bench_with_input(
            BenchmarkId::new("compress", tolerance),
            &frame,
            |b, frame| {
                b.iter(|| codec.compress(black_box(frame), WINDOW, 0).unwrap());
            },
        );
        group.bench_with_input(BenchmarkId::new("decompress", tolerance), &blob, |b, blob| {
            b.iter(|| codec.decompress(black_box(blob), WINDOW, 0, &mut out).unwrap());
        });
    }

    group.finish();
}

/// Benchmark chunk encoding across worker counts.
fn bench_chunk_parallelism(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_encode");
    let frames: Vec<f32> = (0..16).flat_map(wavefield).collect();

    for threads in [1usize, 2, 4] {
        let params = CompressionParameters::new(1e-4, threads, false).unwrap();
        let ctx = CodecContext::quantizing(params).unwrap();

        group.bench_with_input(BenchmarkId::new("threads", threads), &frames, |b, frames| {
            b.iter(|| ctx.encode_frames(black_box(frames), WINDOW, 0).unwrap());
        });
    }

    group.finish();
}

/// Benchmark a complete forward and backward pass.
fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.sample_size(10);

    let nt = 64;
    let root = tempfile::tempdir().unwrap();
    let cases = [
        ("full_fit", CollectorConfig::builder()),
        ("raw_spill", CollectorConfig::builder().max_resident_frames(8)),
        (
            "compressed_spill",
            CollectorConfig::builder()
                .max_resident_frames(8)
                .compression(true)
                .tolerance(1e-4),
        ),
    ];

    for (label, builder) in cases {
        let config = builder.workspace_root(root.path()).build().unwrap();
        let mut collector = ForwardCollector::new(&config).unwrap();
        let mut grid = GridBox::new(
            GridSize::from(WINDOW),
            WINDOW,
            CellDimensions::uniform(10.0),
            nt,
            1e-3,
        )
        .unwrap();
        let source = wavefield(3);

        group.bench_function(BenchmarkId::new("nt64", label), |b| {
            b.iter(|| {
                collector.reset_grid(&mut grid, true).unwrap();
                for t in 0..=nt {
                    collector.save_forward().unwrap();
                    if t < nt {
                        let pair = collector.pressure_mut().unwrap();
                        for (n, (c, s)) in pair.next.iter_mut().zip(pair.current.iter().zip(&source)) {
                            *n = 0.99 * c + 0.01 * s;
                        }
                    }
                }
                collector.reset_grid(&mut grid, false).unwrap();
                let mut acc = 0.0f32;
                for _ in 0..=nt {
                    collector.fetch_forward().unwrap();
                    acc += collector.forward_grid().unwrap().pressure()[0];
                }
                black_box(acc)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_codec,
    bench_chunk_parallelism,
    bench_replay
);
criterion_main!(benches);
