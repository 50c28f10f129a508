//! Breakdown and zone distribution throughput on long synthetic tracks.
//!
//! Run with: `cargo bench --bench breakdown`

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use workout_analytics::{
    breakdown, build_track, heart_rate_distribution, ExtraMetrics, HeartRateZones, Metric,
    TrackPoint, TrackSample,
};

/// One sample per second at ~10 km/h with a pause every 10 minutes.
fn synthetic_track(len: usize) -> Vec<TrackPoint> {
    let start = Utc.with_ymd_and_hms(2024, 5, 4, 8, 0, 0).unwrap();
    let mut distance = 0.0;
    let samples: Vec<TrackSample> = (0..len)
        .map(|i| {
            if i % 600 >= 30 {
                distance += 2.8;
            }
            TrackSample {
                elevation: 100.0 + (i as f64 / 120.0).sin() * 20.0,
                extra_metrics: ExtraMetrics::new()
                    .with(Metric::HeartRate, 120.0 + (i % 60) as f64)
                    .with(Metric::Cadence, 85.0),
                ..TrackSample::new(start + Duration::seconds(i as i64), distance)
            }
        })
        .collect();
    build_track(&samples)
}

fn bench_breakdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("breakdown");

    for len in [3_600usize, 36_000] {
        let points = synthetic_track(len);
        group.bench_with_input(BenchmarkId::new("km", len), &points, |b, points| {
            b.iter(|| breakdown(black_box(points), "km", 1.0));
        });
        group.bench_with_input(BenchmarkId::new("min", len), &points, |b, points| {
            b.iter(|| breakdown(black_box(points), "min", 5.0));
        });
    }

    group.finish();
}

fn bench_zone_distribution(c: &mut Criterion) {
    let mut group = c.benchmark_group("zones");
    let points = synthetic_track(36_000);
    let zones = HeartRateZones::new(190.0, 50.0);

    group.bench_function("heart_rate_distribution", |b| {
        b.iter(|| heart_rate_distribution(black_box(&points), &zones));
    });

    group.finish();
}

criterion_group!(benches, bench_breakdown, bench_zone_distribution);
criterion_main!(benches);
