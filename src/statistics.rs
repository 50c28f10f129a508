//! Calendar-bucketed workout statistics.
//!
//! Workouts are grouped per type into day, week, month or year buckets. Each
//! bucket is keyed by a raw key (`2024-03`, `2024-W10`) used for grouping, and
//! carries a separately formatted display label that never feeds back into the
//! grouping.
//!
//! Average speeds are duration-weighted: `sum(duration_i * speed_i) /
//! sum(duration_i)`. The pause-excluded variant weights by moving time.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, Months, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{AnalyticsError, Result};
use crate::WorkoutType;

/// Per-workout totals as stored with the workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutAggregate {
    pub workout_id: u64,
    pub workout_type: WorkoutType,
    pub date: DateTime<Utc>,
    /// Total elapsed time
    pub duration: Duration,
    /// Stopped time within `duration`
    pub pause_duration: Duration,
    /// Distance in meters
    pub distance: f64,
    /// Elevation gain in meters
    pub elevation_gain: f64,
    /// Average speed over the full duration, m/s
    pub average_speed: f64,
    /// Average speed over moving time, m/s
    pub average_speed_no_pause: f64,
    /// Maximum speed, m/s
    pub max_speed: f64,
}

impl WorkoutAggregate {
    fn moving_seconds(&self) -> f64 {
        self.duration.saturating_sub(self.pause_duration).as_secs_f64()
    }
}

/// Calendar granularity of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
    Year,
}

impl StatsPeriod {
    /// Raw grouping key for a date.
    pub fn bucket_key(&self, date: DateTime<Utc>) -> String {
        match self {
            StatsPeriod::Day => date.format("%Y-%m-%d").to_string(),
            StatsPeriod::Week => date.format("%G-W%V").to_string(),
            StatsPeriod::Month => date.format("%Y-%m").to_string(),
            StatsPeriod::Year => date.format("%Y").to_string(),
        }
    }

    /// Human-readable label for the bucket containing a date.
    pub fn display_label(&self, date: DateTime<Utc>) -> String {
        match self {
            StatsPeriod::Day => date.format("%a %d %b %Y").to_string(),
            StatsPeriod::Week => {
                let week = date.iso_week();
                format!("Week {}, {}", week.week(), week.year())
            }
            StatsPeriod::Month => date.format("%B %Y").to_string(),
            StatsPeriod::Year => date.year().to_string(),
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatsPeriod::Day => "day",
            StatsPeriod::Week => "week",
            StatsPeriod::Month => "month",
            StatsPeriod::Year => "year",
        })
    }
}

impl FromStr for StatsPeriod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(StatsPeriod::Day),
            "week" => Ok(StatsPeriod::Week),
            "month" => Ok(StatsPeriod::Month),
            "year" => Ok(StatsPeriod::Year),
            _ => Err(AnalyticsError::UnknownPeriod {
                name: s.to_string(),
            }),
        }
    }
}

/// How far back to include workouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsSince {
    Forever,
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

impl StatsSince {
    /// Oldest instant still excluded, or `None` for no filter.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            StatsSince::Forever => None,
            StatsSince::Days(n) => now.checked_sub_signed(chrono::Duration::days(n.into())),
            StatsSince::Weeks(n) => now.checked_sub_signed(chrono::Duration::weeks(n.into())),
            StatsSince::Months(n) => now.checked_sub_months(Months::new(n)),
            StatsSince::Years(n) => now.checked_sub_months(Months::new(n.saturating_mul(12))),
        }
    }
}

impl FromStr for StatsSince {
    type Err = AnalyticsError;

    /// Parses `"forever"` or `"<n> <days|weeks|months|years>"` (singular ok).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AnalyticsError::InvalidSince {
            value: s.to_string(),
        };
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "forever" {
            return Ok(StatsSince::Forever);
        }

        let mut parts = normalized.split_whitespace();
        let (Some(count), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let count: u32 = count.parse().map_err(|_| invalid())?;

        match unit.trim_end_matches('s') {
            "day" => Ok(StatsSince::Days(count)),
            "week" => Ok(StatsSince::Weeks(count)),
            "month" => Ok(StatsSince::Months(count)),
            "year" => Ok(StatsSince::Years(count)),
            _ => Err(invalid()),
        }
    }
}

/// Aggregate of one workout type within one calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBucket {
    pub workout_type: WorkoutType,
    /// Raw grouping key
    pub bucket_key: String,
    /// Display label
    pub bucket: String,
    pub workouts: usize,
    pub duration: Duration,
    /// Meters
    pub distance: f64,
    /// Meters of elevation gain
    pub up: f64,
    /// Duration-weighted average speed, m/s
    pub average_speed: f64,
    /// Moving-time-weighted average speed, m/s
    pub average_speed_no_pause: f64,
    /// m/s
    pub max_speed: f64,
}

/// All buckets of one workout type, in chronological key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSet {
    pub workout_type: WorkoutType,
    pub period: StatsPeriod,
    pub buckets: BTreeMap<String, StatBucket>,
}

/// Running sums for one bucket.
#[derive(Debug, Default)]
struct BucketTotals {
    workouts: usize,
    duration: Duration,
    distance: f64,
    up: f64,
    max_speed: f64,
    weighted_speed: f64,
    weight: f64,
    weighted_speed_no_pause: f64,
    weight_no_pause: f64,
}

impl BucketTotals {
    fn add(&mut self, workout: &WorkoutAggregate) {
        let secs = workout.duration.as_secs_f64();
        let moving = workout.moving_seconds();

        self.workouts += 1;
        self.duration += workout.duration;
        self.distance += workout.distance;
        self.up += workout.elevation_gain;
        self.max_speed = self.max_speed.max(workout.max_speed);
        self.weighted_speed += secs * workout.average_speed;
        self.weight += secs;
        self.weighted_speed_no_pause += moving * workout.average_speed_no_pause;
        self.weight_no_pause += moving;
    }

    fn finish(self, workout_type: WorkoutType, bucket_key: String, bucket: String) -> StatBucket {
        StatBucket {
            workout_type,
            bucket_key,
            bucket,
            workouts: self.workouts,
            duration: self.duration,
            distance: self.distance,
            up: self.up,
            average_speed: weighted_mean(self.weighted_speed, self.weight),
            average_speed_no_pause: weighted_mean(self.weighted_speed_no_pause, self.weight_no_pause),
            max_speed: self.max_speed,
        }
    }
}

fn weighted_mean(sum: f64, weight: f64) -> f64 {
    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

/// Bucket one workout type's workouts.
fn bucket_type(workout_type: WorkoutType, workouts: &[&WorkoutAggregate], period: StatsPeriod) -> BucketSet {
    let mut totals: BTreeMap<String, (String, BucketTotals)> = BTreeMap::new();

    for workout in workouts {
        let key = period.bucket_key(workout.date);
        totals
            .entry(key)
            .or_insert_with(|| (period.display_label(workout.date), BucketTotals::default()))
            .1
            .add(workout);
    }

    let buckets = totals
        .into_iter()
        .map(|(key, (label, sums))| {
            let bucket = sums.finish(workout_type, key.clone(), label);
            (key, bucket)
        })
        .collect();

    BucketSet {
        workout_type,
        period,
        buckets,
    }
}

/// Apply the `since` filter and split by workout type.
fn group_by_type(
    workouts: &[WorkoutAggregate],
    since: StatsSince,
    now: DateTime<Utc>,
) -> BTreeMap<WorkoutType, Vec<&WorkoutAggregate>> {
    let cutoff = since.cutoff(now);
    let mut groups: BTreeMap<WorkoutType, Vec<&WorkoutAggregate>> = BTreeMap::new();

    for workout in workouts {
        if cutoff.map_or(true, |c| workout.date > c) {
            groups.entry(workout.workout_type).or_default().push(workout);
        }
    }
    groups
}

/// Group a user's workouts into calendar buckets per workout type.
///
/// # Arguments
/// * `workouts` - Per-workout totals, any order
/// * `period` - Bucket granularity
/// * `since` - Only workouts newer than `now - since` are counted
/// * `now` - Reference instant for `since`
pub fn bucket(
    workouts: &[WorkoutAggregate],
    period: StatsPeriod,
    since: StatsSince,
    now: DateTime<Utc>,
) -> BTreeMap<WorkoutType, BucketSet> {
    let result: BTreeMap<WorkoutType, BucketSet> = group_by_type(workouts, since, now)
        .into_iter()
        .map(|(workout_type, group)| (workout_type, bucket_type(workout_type, &group, period)))
        .collect();

    debug!(
        "[Statistics] Bucketed {} workouts by {} into {} types",
        workouts.len(),
        period,
        result.len()
    );
    result
}

/// Bucket workouts using parallel processing, one task per workout type.
/// More efficient for long histories (> 10,000 workouts).
#[cfg(feature = "parallel")]
pub fn bucket_parallel(
    workouts: &[WorkoutAggregate],
    period: StatsPeriod,
    since: StatsSince,
    now: DateTime<Utc>,
) -> BTreeMap<WorkoutType, BucketSet> {
    if workouts.len() < 10_000 {
        return bucket(workouts, period, since, now);
    }

    let groups: Vec<(WorkoutType, Vec<&WorkoutAggregate>)> =
        group_by_type(workouts, since, now).into_iter().collect();

    groups
        .par_iter()
        .map(|(workout_type, group)| (*workout_type, bucket_type(*workout_type, group, period)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 18, 0, 0).unwrap()
    }

    fn workout(
        id: u64,
        workout_type: WorkoutType,
        date: DateTime<Utc>,
        secs: u64,
        pause_secs: u64,
        speed: f64,
    ) -> WorkoutAggregate {
        WorkoutAggregate {
            workout_id: id,
            workout_type,
            date,
            duration: Duration::from_secs(secs),
            pause_duration: Duration::from_secs(pause_secs),
            distance: secs as f64 * speed,
            elevation_gain: 10.0,
            average_speed: speed,
            average_speed_no_pause: speed * 1.5,
            max_speed: speed * 2.0,
        }
    }

    #[test]
    fn test_weighted_average_speed() {
        let workouts = vec![
            workout(1, WorkoutType::Running, at(2024, 3, 4), 10, 0, 2.0),
            workout(2, WorkoutType::Running, at(2024, 3, 20), 30, 0, 4.0),
        ];
        let result = bucket(&workouts, StatsPeriod::Month, StatsSince::Forever, at(2024, 12, 1));

        let set = &result[&WorkoutType::Running];
        let march = &set.buckets["2024-03"];
        assert_eq!(march.workouts, 2);
        assert!((march.average_speed - 3.5).abs() < 1e-9);
        assert_eq!(march.duration, Duration::from_secs(40));
        assert!((march.distance - 140.0).abs() < 1e-9);
        assert_eq!(march.up, 20.0);
        assert_eq!(march.max_speed, 8.0);
        assert_eq!(march.bucket, "March 2024");
    }

    #[test]
    fn test_no_pause_average_weights_by_moving_time() {
        let workouts = vec![
            workout(1, WorkoutType::Cycling, at(2024, 3, 4), 100, 90, 2.0),
            workout(2, WorkoutType::Cycling, at(2024, 3, 5), 100, 70, 4.0),
        ];
        let result = bucket(&workouts, StatsPeriod::Year, StatsSince::Forever, at(2024, 12, 1));
        let year = &result[&WorkoutType::Cycling].buckets["2024"];

        // (10 * 3 + 30 * 6) / 40
        assert!((year.average_speed_no_pause - 5.25).abs() < 1e-9);
        assert!((year.average_speed - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_durations_do_not_divide_by_zero() {
        let workouts = vec![workout(1, WorkoutType::Walking, at(2024, 1, 1), 0, 0, 3.0)];
        let result = bucket(&workouts, StatsPeriod::Day, StatsSince::Forever, at(2024, 12, 1));
        let day = &result[&WorkoutType::Walking].buckets["2024-01-01"];
        assert_eq!(day.average_speed, 0.0);
        assert_eq!(day.average_speed_no_pause, 0.0);
    }

    #[test]
    fn test_types_are_bucketed_separately() {
        let workouts = vec![
            workout(1, WorkoutType::Running, at(2024, 3, 4), 60, 0, 3.0),
            workout(2, WorkoutType::Cycling, at(2024, 3, 4), 60, 0, 8.0),
            workout(3, WorkoutType::Running, at(2024, 4, 4), 60, 0, 3.0),
        ];
        let result = bucket(&workouts, StatsPeriod::Month, StatsSince::Forever, at(2024, 12, 1));

        assert_eq!(result.len(), 2);
        let keys: Vec<&String> = result[&WorkoutType::Running].buckets.keys().collect();
        assert_eq!(keys, vec!["2024-03", "2024-04"]);
        assert_eq!(result[&WorkoutType::Cycling].buckets.len(), 1);
    }

    #[test]
    fn test_week_keys_use_iso_weeks() {
        // 2024-12-30 belongs to ISO week 1 of 2025
        let date = at(2024, 12, 30);
        assert_eq!(StatsPeriod::Week.bucket_key(date), "2025-W01");
        assert_eq!(StatsPeriod::Week.display_label(date), "Week 1, 2025");
        assert_eq!(StatsPeriod::Day.bucket_key(date), "2024-12-30");
        assert_eq!(StatsPeriod::Day.display_label(date), "Mon 30 Dec 2024");
    }

    #[test]
    fn test_since_filter() {
        let now = at(2024, 6, 30);
        let workouts = vec![
            workout(1, WorkoutType::Running, at(2023, 1, 1), 60, 0, 3.0),
            workout(2, WorkoutType::Running, at(2024, 6, 1), 60, 0, 3.0),
        ];

        let recent = bucket(&workouts, StatsPeriod::Year, "1 month".parse().unwrap(), now);
        let buckets = &recent[&WorkoutType::Running].buckets;
        assert_eq!(buckets.len(), 1);
        assert!(buckets.contains_key("2024"));

        let all = bucket(&workouts, StatsPeriod::Year, "forever".parse().unwrap(), now);
        assert_eq!(all[&WorkoutType::Running].buckets.len(), 2);

        let none = bucket(&workouts, StatsPeriod::Year, StatsSince::Days(7), now);
        assert!(none.is_empty());
    }

    #[test]
    fn test_parse_since_and_period() {
        assert_eq!("10 years".parse::<StatsSince>().unwrap(), StatsSince::Years(10));
        assert_eq!("1 week".parse::<StatsSince>().unwrap(), StatsSince::Weeks(1));
        assert_eq!(" Forever ".parse::<StatsSince>().unwrap(), StatsSince::Forever);
        assert!("soon".parse::<StatsSince>().is_err());
        assert!("3 fortnights".parse::<StatsSince>().is_err());
        assert!("-1 days".parse::<StatsSince>().is_err());

        assert_eq!("Month".parse::<StatsPeriod>().unwrap(), StatsPeriod::Month);
        assert!(matches!(
            "decade".parse::<StatsPeriod>(),
            Err(AnalyticsError::UnknownPeriod { .. })
        ));
    }

    #[test]
    fn test_cutoff() {
        let now = at(2024, 3, 31);
        assert_eq!(StatsSince::Forever.cutoff(now), None);
        assert_eq!(StatsSince::Months(1).cutoff(now), Some(at(2024, 2, 29)));
        assert_eq!(StatsSince::Years(1).cutoff(now), Some(at(2023, 3, 31)));
        assert_eq!(StatsSince::Weeks(2).cutoff(now), Some(at(2024, 3, 17)));
    }
}
