//! # Workout Analytics
//!
//! Pure analytics for recorded workouts: turns an ordered track of points and
//! a user's workout history into derived views.
//!
//! This library provides:
//! - Breakdowns of one workout into fixed distance or duration chunks
//! - Personal records per distance label, and best-first leaderboards
//! - Calendar-bucketed statistics with duration-weighted speeds
//! - Heart rate and power training zones
//!
//! Nothing here performs I/O. Callers load points and history, call one
//! function, and serialize the result however they like.
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel processing with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use workout_analytics::{breakdown, build_track, TrackSample};
//! use chrono::{TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 5, 7, 0, 0).unwrap();
//! let samples: Vec<TrackSample> = (0..=30)
//!     .map(|i| TrackSample::new(start + chrono::Duration::seconds(i * 60), i as f64 * 200.0))
//!     .collect();
//!
//! let points = build_track(&samples);
//! let items = breakdown(&points, "km", 1.0).unwrap();
//! assert_eq!(items.len(), 6);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{AnalyticsError, OptionExt, Result};

// Immutable lookup tables (distance ladders, zone defaults)
pub mod config;
pub use config::{AnalyticsConfig, DistanceLabel, DistanceLabels, ZoneDefaults};

// Unit parsing and conversions
pub mod units;
pub use units::{BreakdownUnit, PAUSE_SPEED_THRESHOLD_KMH};

// Per-range min/max/avg statistics
pub mod range_stats;
pub use range_stats::{MinMaxAvg, PointRangeStats, RangeStats, RangeStatsAggregator};

// Breakdown segmentation
pub mod breakdown;
pub use breakdown::{breakdown, segment, segment_with, BreakdownItem};

// Personal records
pub mod records;
pub use records::{
    best_per_label, biggest_climb, record_summary, type_records, ClimbCategory, ClimbRecord,
    DistanceRecord, IntervalRecord, RecordKey, SortDirection, TypeRecords, ValueRecord,
    WorkoutClimb,
};

// Leaderboards
pub mod ranking;
pub use ranking::{
    rank_climbs, rank_distance, ClimbQuery, DateRange, PageRequest, RankQuery, RankedPage,
};

// Calendar statistics
pub mod statistics;
pub use statistics::{bucket, BucketSet, StatBucket, StatsPeriod, StatsSince, WorkoutAggregate};
#[cfg(feature = "parallel")]
pub use statistics::bucket_parallel;

// Heart rate and power zones
pub mod zones;
pub use zones::{
    classify_points, heart_rate_boundaries, heart_rate_distribution, heart_rate_zone,
    power_boundaries, power_distribution, power_zone, HeartRateZones, PointZones, PowerZones,
    UserBaselines, ZoneBoundary, ZoneDistribution,
};
#[cfg(feature = "parallel")]
pub use zones::{heart_rate_distribution_parallel, power_distribution_parallel};

// ============================================================================
// Core Types
// ============================================================================

/// Named extra sensor metrics a point may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    HeartRate,
    Power,
    Cadence,
    Speed,
    Temperature,
    RespirationRate,
}

/// Sparse bag of extra metrics.
///
/// A missing metric is `None`; a recorded zero is a real reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraMetrics(BTreeMap<Metric, f64>);

impl ExtraMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.0.insert(metric, value);
        self
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        self.0.insert(metric, value);
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One recorded sample of a workout track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    /// Elevation in meters
    pub elevation: f64,
    /// Slope grade in percent, relative to the previous point
    pub slope_grade: f64,
    /// Distance covered since the previous point, in meters
    pub distance: f64,
    /// Distance covered since the start of the workout, in meters
    pub total_distance: f64,
    /// Time elapsed since the previous point
    pub duration: Duration,
    /// Time elapsed since the start of the workout
    pub total_duration: Duration,
    #[serde(default)]
    pub extra_metrics: ExtraMetrics,
}

impl TrackPoint {
    /// Instantaneous speed in m/s (zero when no time elapsed).
    pub fn speed(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.distance / secs
        } else {
            0.0
        }
    }

    /// Instantaneous speed in km/h.
    pub fn speed_kmh(&self) -> f64 {
        units::mps_to_kmh(self.speed())
    }

    /// Whether this point counts toward moving time.
    pub fn is_moving(&self) -> bool {
        self.speed_kmh() >= PAUSE_SPEED_THRESHOLD_KMH
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.extra_metrics.get(metric)
    }
}

/// A raw sample carrying only cumulative distance, as ingestion produces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSample {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    pub elevation: f64,
    /// Cumulative distance in meters
    pub total_distance: f64,
    #[serde(default)]
    pub extra_metrics: ExtraMetrics,
}

impl TrackSample {
    /// Create a sample with only time and cumulative distance set.
    pub fn new(time: DateTime<Utc>, total_distance: f64) -> Self {
        Self {
            time,
            lat: 0.0,
            lng: 0.0,
            elevation: 0.0,
            total_distance,
            extra_metrics: ExtraMetrics::new(),
        }
    }
}

/// Derive per-point deltas, totals and slope from cumulative samples.
///
/// Backwards steps in time or distance are clamped to zero so totals stay
/// monotonic.
pub fn build_track(samples: &[TrackSample]) -> Vec<TrackPoint> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };

    let mut points = Vec::with_capacity(samples.len());
    let mut total_distance = 0.0;
    let mut total_duration = Duration::ZERO;
    let mut prev = first;

    for sample in samples {
        let distance = (sample.total_distance - prev.total_distance).max(0.0);
        let duration = (sample.time - prev.time).to_std().unwrap_or(Duration::ZERO);
        let slope_grade = if distance > 0.0 {
            (sample.elevation - prev.elevation) / distance * 100.0
        } else {
            0.0
        };

        total_distance += distance;
        total_duration += duration;

        points.push(TrackPoint {
            time: sample.time,
            lat: sample.lat,
            lng: sample.lng,
            elevation: sample.elevation,
            slope_grade,
            distance,
            total_distance,
            duration,
            total_duration,
            extra_metrics: sample.extra_metrics.clone(),
        });
        prev = sample;
    }

    points
}

/// Kind of workout; selects distance ladders and statistics grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    Running,
    Cycling,
    Walking,
    Hiking,
    Swimming,
    Rowing,
    Skiing,
}

impl WorkoutType {
    pub const ALL: [WorkoutType; 7] = [
        WorkoutType::Running,
        WorkoutType::Cycling,
        WorkoutType::Walking,
        WorkoutType::Hiking,
        WorkoutType::Swimming,
        WorkoutType::Rowing,
        WorkoutType::Skiing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutType::Running => "running",
            WorkoutType::Cycling => "cycling",
            WorkoutType::Walking => "walking",
            WorkoutType::Hiking => "hiking",
            WorkoutType::Swimming => "swimming",
            WorkoutType::Rowing => "rowing",
            WorkoutType::Skiing => "skiing",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkoutType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        WorkoutType::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or(AnalyticsError::UnknownWorkoutType {
                name: s.to_string(),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(secs: i64, distance: f64, elevation: f64) -> TrackSample {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        TrackSample {
            elevation,
            ..TrackSample::new(start + chrono::Duration::seconds(secs), distance)
        }
    }

    #[test]
    fn test_build_track_derives_deltas() {
        let points = build_track(&[
            sample(0, 0.0, 100.0),
            sample(10, 50.0, 105.0),
            sample(20, 120.0, 105.0),
        ]);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].distance, 0.0);
        assert_eq!(points[0].duration, Duration::ZERO);
        assert_eq!(points[1].distance, 50.0);
        assert_eq!(points[1].duration, Duration::from_secs(10));
        assert!((points[1].slope_grade - 10.0).abs() < 1e-9);
        assert_eq!(points[2].total_distance, 120.0);
        assert_eq!(points[2].total_duration, Duration::from_secs(20));
    }

    #[test]
    fn test_build_track_clamps_backwards_steps() {
        let points = build_track(&[sample(10, 100.0, 0.0), sample(5, 90.0, 0.0)]);
        assert_eq!(points[1].distance, 0.0);
        assert_eq!(points[1].duration, Duration::ZERO);
        assert_eq!(points[1].total_distance, 0.0);
    }

    #[test]
    fn test_point_speed() {
        let points = build_track(&[sample(0, 0.0, 0.0), sample(10, 50.0, 0.0)]);
        assert!((points[1].speed() - 5.0).abs() < 1e-9);
        assert!((points[1].speed_kmh() - 18.0).abs() < 1e-9);
        assert!(points[1].is_moving());
        assert!(!points[0].is_moving());
    }

    #[test]
    fn test_zero_metric_is_present() {
        let metrics = ExtraMetrics::new().with(Metric::Power, 0.0);
        assert_eq!(metrics.get(Metric::Power), Some(0.0));
        assert_eq!(metrics.get(Metric::HeartRate), None);
    }

    #[test]
    fn test_workout_type_parse() {
        assert_eq!("Running".parse::<WorkoutType>().unwrap(), WorkoutType::Running);
        assert_eq!(WorkoutType::Cycling.to_string(), "cycling");
        assert!(matches!(
            "curling".parse::<WorkoutType>(),
            Err(AnalyticsError::UnknownWorkoutType { .. })
        ));
    }
}
