//! End-to-end properties of the analytics engine.
//!
//! Exercises the public API only: breakdowns, records, rankings,
//! statistics and zones over small synthetic histories.
//!
//! Run with: `cargo test --test engine_properties`

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use workout_analytics::{
    breakdown, bucket, build_track, heart_rate_zone, power_zone, rank_distance,
    AnalyticsConfig, AnalyticsError, IntervalRecord, RankQuery, StatsPeriod, StatsSince,
    TrackSample, WorkoutAggregate, WorkoutType,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 14, 9, 0, 0).unwrap()
}

/// Irregular track: varying step lengths, a stop in the middle.
fn irregular_samples() -> Vec<TrackSample> {
    let steps = [
        0.0, 180.0, 220.0, 0.0, 0.0, 310.0, 95.0, 400.0, 260.0, 0.0, 150.0, 330.0, 45.0, 510.0,
        120.0, 275.0,
    ];
    let mut total = 0.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            total += step;
            TrackSample {
                elevation: 50.0 + (i as f64 * 0.7).sin() * 8.0,
                ..TrackSample::new(start() + chrono::Duration::seconds(i as i64 * 45), total)
            }
        })
        .collect()
}

fn interval(id: u64, seconds: f64, day: u32) -> IntervalRecord {
    IntervalRecord {
        workout_id: id,
        workout_type: WorkoutType::Running,
        workout_date: Utc.with_ymd_and_hms(2024, 5, day, 7, 0, 0).unwrap(),
        label: "10 km".to_string(),
        target_distance: 10_000.0,
        distance: 10_000.0,
        duration_seconds: seconds,
        average_speed: 10_000.0 / seconds,
        start_index: 0,
        end_index: 100,
    }
}

// ============================================================================
// Breakdown
// ============================================================================

#[test]
fn test_breakdown_partitions_and_conserves_distance() {
    init_logging();
    let points = build_track(&irregular_samples());
    let total = points.last().unwrap().total_distance;

    for (unit, count) in [("km", 1.0), ("m", 250.0), ("mi", 0.5), ("min", 2.0), ("sec", 90.0)] {
        let items = breakdown(&points, unit, count).unwrap();

        assert_eq!(items.first().unwrap().start_index, 0, "{unit}");
        assert_eq!(items.last().unwrap().end_index, points.len() - 1, "{unit}");
        for pair in items.windows(2) {
            assert_eq!(pair[0].end_index, pair[1].start_index, "{unit}");
        }

        let sum: f64 = items.iter().map(|i| i.distance).sum();
        assert!((sum - total).abs() < 1e-6, "{unit}: {sum} vs {total}");

        assert_eq!(items.iter().filter(|i| i.is_best).count(), 1, "{unit}");
        assert_eq!(items.iter().filter(|i| i.is_worst).count(), 1, "{unit}");
    }
}

#[test]
fn test_breakdown_excludes_pauses_from_moving_time() {
    init_logging();
    // 0.5 km/h for 5 s, then 10 km/h for 5 s
    let samples = vec![
        TrackSample::new(start(), 0.0),
        TrackSample::new(start() + chrono::Duration::seconds(5), 0.5 / 3.6 * 5.0),
        TrackSample::new(
            start() + chrono::Duration::seconds(10),
            0.5 / 3.6 * 5.0 + 10.0 / 3.6 * 5.0,
        ),
    ];
    let items = breakdown(&build_track(&samples), "km", 1.0).unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].duration, Duration::from_secs(5));
    assert_eq!(items[0].pause_duration, Duration::from_secs(5));
}

#[test]
fn test_breakdown_rejects_bad_input() {
    init_logging();
    let points = build_track(&irregular_samples());

    assert!(breakdown(&[], "km", 1.0).unwrap_err().is_no_data());
    assert!(breakdown(&points, "km", 0.0).unwrap_err().is_invalid_input());
    assert!(matches!(
        breakdown(&points, "furlong", 1.0),
        Err(AnalyticsError::UnknownUnit { .. })
    ));
}

// ============================================================================
// Records and ranking
// ============================================================================

#[test]
fn test_ranking_is_deterministic() {
    init_logging();
    let config = AnalyticsConfig::default();
    let rows = vec![
        interval(4, 2700.0, 20),
        interval(2, 2400.0, 10),
        interval(9, 2400.0, 3),
        interval(7, 3000.0, 1),
        interval(5, 2400.0, 3),
    ];
    let query = RankQuery::new("10 km", WorkoutType::Running);

    let first = rank_distance(&rows, &query, &config).unwrap();
    let second = rank_distance(&rows, &query, &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.total_count, 5);

    let ids: Vec<Option<u64>> = first.records.iter().map(|r| r.workout_id).collect();
    assert_eq!(ids, vec![Some(5), Some(9), Some(2), Some(4), Some(7)]);

    // Input order does not matter
    let mut reversed = rows.clone();
    reversed.reverse();
    assert_eq!(rank_distance(&reversed, &query, &config).unwrap(), first);
}

#[test]
fn test_unknown_label_is_an_error() {
    init_logging();
    let query = RankQuery::new("99 km", WorkoutType::Running);
    let result = rank_distance(&[interval(1, 2400.0, 1)], &query, &AnalyticsConfig::default());

    assert!(matches!(result, Err(AnalyticsError::UnknownLabel { .. })));
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn test_bucketed_speed_is_duration_weighted() {
    init_logging();
    let workout = |id: u64, secs: u64, speed: f64| WorkoutAggregate {
        workout_id: id,
        workout_type: WorkoutType::Cycling,
        date: Utc.with_ymd_and_hms(2024, 6, 3 + id as u32, 18, 0, 0).unwrap(),
        duration: Duration::from_secs(secs),
        pause_duration: Duration::ZERO,
        distance: secs as f64 * speed,
        elevation_gain: 0.0,
        average_speed: speed,
        average_speed_no_pause: speed,
        max_speed: speed * 1.5,
    };
    let workouts = vec![workout(1, 10, 2.0), workout(2, 30, 4.0)];
    let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();

    let stats = bucket(&workouts, StatsPeriod::Month, StatsSince::Forever, now);
    let month = &stats[&WorkoutType::Cycling].buckets["2024-06"];

    assert_eq!(month.workouts, 2);
    assert!((month.average_speed - 3.5).abs() < 1e-9);
    assert!((month.max_speed - 6.0).abs() < 1e-9);
}

// ============================================================================
// Zones
// ============================================================================

#[test]
fn test_zone_reference_values() {
    assert_eq!(heart_rate_zone(150.0, 190.0, 50.0), 3);
    assert_eq!(power_zone(310.0, 300.0), 4);
}
