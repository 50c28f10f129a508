//! Personal record extraction.
//!
//! Interval rows (best effort per workout and distance label) are produced at
//! ingestion time. This module reduces them to one best row per label, builds
//! the per-type "all-time bests" summary, and finds the biggest climb of a
//! single workout.
//!
//! Record ordering is data, not nested conditionals: an ordered list of
//! `(key, direction)` pairs evaluated left to right (see [`RANKING_ORDER`]).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;
use crate::statistics::WorkoutAggregate;
use crate::{TrackPoint, WorkoutType};

// ============================================================================
// Comparators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// A key that can order rows of type `T`.
pub trait SortKey<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Compare two rows by an ordered list of keys; the first non-equal key wins.
pub fn compare_by<T, K: SortKey<T>>(order: &[(K, SortDirection)], a: &T, b: &T) -> Ordering {
    order
        .iter()
        .map(|(key, direction)| direction.apply(key.compare(a, b)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Keys of an [`IntervalRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKey {
    Duration,
    Distance,
    Date,
    WorkoutId,
}

impl SortKey<IntervalRecord> for RecordKey {
    fn compare(&self, a: &IntervalRecord, b: &IntervalRecord) -> Ordering {
        match self {
            RecordKey::Duration => a.duration_seconds.total_cmp(&b.duration_seconds),
            RecordKey::Distance => a.distance.total_cmp(&b.distance),
            RecordKey::Date => a.workout_date.cmp(&b.workout_date),
            RecordKey::WorkoutId => a.workout_id.cmp(&b.workout_id),
        }
    }
}

/// "Better record": faster, then longer.
pub const BEST_RECORD_ORDER: &[(RecordKey, SortDirection)] = &[
    (RecordKey::Duration, SortDirection::Ascending),
    (RecordKey::Distance, SortDirection::Descending),
];

/// Leaderboard order. Starts with [`BEST_RECORD_ORDER`], then falls back to
/// the earliest workout so the order is total.
pub const RANKING_ORDER: &[(RecordKey, SortDirection)] = &[
    (RecordKey::Duration, SortDirection::Ascending),
    (RecordKey::Distance, SortDirection::Descending),
    (RecordKey::Date, SortDirection::Ascending),
    (RecordKey::WorkoutId, SortDirection::Ascending),
];

// ============================================================================
// Distance records
// ============================================================================

/// Stored best effort for one (workout, label) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalRecord {
    pub workout_id: u64,
    pub workout_type: WorkoutType,
    pub workout_date: DateTime<Utc>,
    /// Distance label, e.g. "10 km"
    pub label: String,
    /// Target distance in meters
    pub target_distance: f64,
    /// Achieved distance in meters
    pub distance: f64,
    pub duration_seconds: f64,
    /// Average speed in m/s
    pub average_speed: f64,
    pub start_index: usize,
    pub end_index: usize,
}

impl IntervalRecord {
    /// Rows with no elapsed time cannot be a record.
    pub fn qualifies(&self) -> bool {
        self.duration_seconds.is_finite() && self.duration_seconds > 0.0
    }
}

/// The best effort for a label, annotated with its workout.
///
/// `workout_id` and `date` are `None` only for inactive placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub label: String,
    pub target_distance: f64,
    pub distance: f64,
    pub duration_seconds: f64,
    pub average_speed: f64,
    pub workout_id: Option<u64>,
    pub date: Option<DateTime<Utc>>,
    pub start_index: usize,
    pub end_index: usize,
    pub active: bool,
}

impl DistanceRecord {
    /// Placeholder for a label with no qualifying effort.
    pub fn inactive(label: &str, target_distance: f64) -> Self {
        Self {
            label: label.to_string(),
            target_distance,
            distance: 0.0,
            duration_seconds: 0.0,
            average_speed: 0.0,
            workout_id: None,
            date: None,
            start_index: 0,
            end_index: 0,
            active: false,
        }
    }
}

impl From<&IntervalRecord> for DistanceRecord {
    fn from(row: &IntervalRecord) -> Self {
        Self {
            label: row.label.clone(),
            target_distance: row.target_distance,
            distance: row.distance,
            duration_seconds: row.duration_seconds,
            average_speed: row.average_speed,
            workout_id: Some(row.workout_id),
            date: Some(row.workout_date),
            start_index: row.start_index,
            end_index: row.end_index,
            active: true,
        }
    }
}

/// Best row per label, considering only labels in `valid_labels`.
///
/// Exact duration and distance ties are resolved by [`RANKING_ORDER`], so the
/// result does not depend on row order.
pub fn best_per_label(
    rows: &[IntervalRecord],
    valid_labels: &HashSet<&str>,
) -> HashMap<String, DistanceRecord> {
    let mut best: HashMap<&str, &IntervalRecord> = HashMap::new();

    for row in rows {
        if !row.qualifies() || !valid_labels.contains(row.label.as_str()) {
            continue;
        }
        best.entry(row.label.as_str())
            .and_modify(|current| {
                if compare_by(RANKING_ORDER, row, *current).is_lt() {
                    *current = row;
                }
            })
            .or_insert(row);
    }

    debug!(
        "[Records] Reduced {} interval rows to {} labels",
        rows.len(),
        best.len()
    );

    best.into_iter()
        .map(|(label, row)| (label.to_string(), DistanceRecord::from(row)))
        .collect()
}

/// Personal records view for one workout type: one entry per ladder label, in
/// ladder order, inactive where no effort exists.
pub fn record_summary(
    rows: &[IntervalRecord],
    workout_type: WorkoutType,
    config: &AnalyticsConfig,
) -> Vec<DistanceRecord> {
    let typed: Vec<IntervalRecord> = rows
        .iter()
        .filter(|r| r.workout_type == workout_type)
        .cloned()
        .collect();
    let valid = config.distance_labels.valid_labels(workout_type);
    let mut best = best_per_label(&typed, &valid);

    config
        .distance_labels
        .ladder(workout_type)
        .iter()
        .map(|entry| {
            best.remove(&entry.label)
                .unwrap_or_else(|| DistanceRecord::inactive(&entry.label, entry.distance))
        })
        .collect()
}

// ============================================================================
// Per-type value records
// ============================================================================

/// An all-time best single value and the workout that set it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub value: f64,
    pub workout_id: Option<u64>,
    pub date: Option<DateTime<Utc>>,
    pub active: bool,
}

/// All-time bests over a user's workouts of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRecords {
    pub workout_type: WorkoutType,
    /// True if the user has any workout of this type
    pub active: bool,
    /// Farthest distance (m)
    pub distance: ValueRecord,
    /// Longest duration (s)
    pub duration: ValueRecord,
    /// Most elevation gain (m)
    pub total_up: ValueRecord,
    /// Fastest average speed (m/s)
    pub average_speed: ValueRecord,
    /// Fastest average speed excluding pauses (m/s)
    pub average_speed_no_pause: ValueRecord,
    /// Highest max speed (m/s)
    pub max_speed: ValueRecord,
}

/// Compute all-time bests for one workout type.
pub fn type_records(workouts: &[WorkoutAggregate], workout_type: WorkoutType) -> TypeRecords {
    let typed: Vec<&WorkoutAggregate> = workouts
        .iter()
        .filter(|w| w.workout_type == workout_type)
        .collect();

    TypeRecords {
        workout_type,
        active: !typed.is_empty(),
        distance: max_record(&typed, |w| w.distance),
        duration: max_record(&typed, |w| w.duration.as_secs_f64()),
        total_up: max_record(&typed, |w| w.elevation_gain),
        average_speed: max_record(&typed, |w| w.average_speed),
        average_speed_no_pause: max_record(&typed, |w| w.average_speed_no_pause),
        max_speed: max_record(&typed, |w| w.max_speed),
    }
}

/// Largest positive value; ties go to the earliest workout.
fn max_record<F>(workouts: &[&WorkoutAggregate], value: F) -> ValueRecord
where
    F: Fn(&WorkoutAggregate) -> f64,
{
    workouts
        .iter()
        .map(|&w| (w, value(w)))
        .filter(|(_, v)| v.is_finite() && *v > 0.0)
        .max_by(|(a, va), (b, vb)| {
            va.total_cmp(vb)
                .then_with(|| b.date.cmp(&a.date))
                .then_with(|| b.workout_id.cmp(&a.workout_id))
        })
        .map(|(w, v)| ValueRecord {
            value: v,
            workout_id: Some(w.workout_id),
            date: Some(w.date),
            active: true,
        })
        .unwrap_or_default()
}

// ============================================================================
// Climbs
// ============================================================================

/// Climb category by the distance × grade score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClimbCategory {
    #[default]
    Uncategorized,
    #[serde(rename = "4")]
    Cat4,
    #[serde(rename = "3")]
    Cat3,
    #[serde(rename = "2")]
    Cat2,
    #[serde(rename = "1")]
    Cat1,
    #[serde(rename = "HC")]
    HorsCategorie,
}

impl ClimbCategory {
    /// Categorise from length in meters and average grade in percent.
    pub fn from_score(length: f64, slope_percent: f64) -> Self {
        match length * slope_percent {
            s if s >= 80_000.0 => ClimbCategory::HorsCategorie,
            s if s >= 64_000.0 => ClimbCategory::Cat1,
            s if s >= 32_000.0 => ClimbCategory::Cat2,
            s if s >= 16_000.0 => ClimbCategory::Cat3,
            s if s >= 8_000.0 => ClimbCategory::Cat4,
            _ => ClimbCategory::Uncategorized,
        }
    }
}

/// The biggest contiguous ascent of one workout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimbRecord {
    /// Elevation gain in meters
    pub gain: f64,
    /// Length in meters
    pub length: f64,
    /// Average grade in percent
    pub average_slope: f64,
    pub category: ClimbCategory,
    pub start_index: usize,
    pub end_index: usize,
    pub active: bool,
}

/// A workout's biggest climb, as stored alongside the workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutClimb {
    pub workout_id: u64,
    pub workout_type: WorkoutType,
    pub date: DateTime<Utc>,
    pub climb: ClimbRecord,
}

/// Keys of a [`WorkoutClimb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClimbKey {
    Gain,
    Date,
    WorkoutId,
}

impl SortKey<WorkoutClimb> for ClimbKey {
    fn compare(&self, a: &WorkoutClimb, b: &WorkoutClimb) -> Ordering {
        match self {
            ClimbKey::Gain => a.climb.gain.total_cmp(&b.climb.gain),
            ClimbKey::Date => a.date.cmp(&b.date),
            ClimbKey::WorkoutId => a.workout_id.cmp(&b.workout_id),
        }
    }
}

/// Climb leaderboard order: biggest gain first.
pub const CLIMB_RANKING_ORDER: &[(ClimbKey, SortDirection)] = &[
    (ClimbKey::Gain, SortDirection::Descending),
    (ClimbKey::Date, SortDirection::Ascending),
    (ClimbKey::WorkoutId, SortDirection::Ascending),
];

/// Find the biggest contiguous ascent in a workout.
///
/// An ascent runs from the point before the first rise to the last rise before
/// any descent; flat stretches inside it are kept. Returns an inactive record
/// when the track never climbs. Ties go to the earliest ascent.
pub fn biggest_climb(points: &[TrackPoint]) -> ClimbRecord {
    let mut best: Option<(usize, usize)> = None;
    let mut current: Option<(usize, usize)> = None;

    let gain = |(start, end): (usize, usize)| points[end].elevation - points[start].elevation;

    for i in 1..points.len() {
        let delta = points[i].elevation - points[i - 1].elevation;
        if delta > 0.0 {
            current = Some(match current {
                Some((start, _)) => (start, i),
                None => (i - 1, i),
            });
        } else if delta < 0.0 {
            if let Some(run) = current.take() {
                if best.map_or(true, |b| gain(run) > gain(b)) {
                    best = Some(run);
                }
            }
        }
    }
    if let Some(run) = current {
        if best.map_or(true, |b| gain(run) > gain(b)) {
            best = Some(run);
        }
    }

    let Some((start, end)) = best else {
        return ClimbRecord::default();
    };

    let climb_gain = gain((start, end));
    let length = points[end].total_distance - points[start].total_distance;
    let average_slope = if length > 0.0 {
        climb_gain / length * 100.0
    } else {
        0.0
    };

    ClimbRecord {
        gain: climb_gain,
        length,
        average_slope,
        category: ClimbCategory::from_score(length, average_slope),
        start_index: start,
        end_index: end,
        active: climb_gain > 0.0,
    }
}
