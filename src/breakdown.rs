//! Breakdown of a workout into fixed distance or duration chunks.
//!
//! The segmenter walks the points once. A running chunk absorbs points until
//! the next unit boundary (`counter * step`) is reached; the point that reaches
//! it closes the chunk, and the following chunk starts at that same index. The
//! chunks therefore partition `[0, N-1]` with shared boundary indices, and the
//! sum of chunk distances equals the workout distance.
//!
//! ## Example
//! ```rust
//! use workout_analytics::{build_track, segment, BreakdownUnit, TrackSample};
//! use chrono::{TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
//! let samples: Vec<TrackSample> = (0..=25)
//!     .map(|i| TrackSample::new(start + chrono::Duration::seconds(i * 30), i as f64 * 100.0))
//!     .collect();
//!
//! let items = segment(&build_track(&samples), BreakdownUnit::Distance(1000.0)).unwrap();
//! assert_eq!(items.len(), 3);
//! assert_eq!(items[2].distance, 500.0);
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::range_stats::{MinMaxAvg, PointRangeStats, RangeStatsAggregator};
use crate::units::BreakdownUnit;
use crate::TrackPoint;

/// One chunk of a workout breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    /// 1-based sequence number
    pub counter: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub first_point_time: DateTime<Utc>,
    pub last_point_time: DateTime<Utc>,
    /// Distance covered in this chunk, in meters
    pub distance: f64,
    /// Workout distance at the end of this chunk, in meters
    pub total_distance: f64,
    /// Moving time in this chunk
    pub duration: Duration,
    /// Stopped time in this chunk
    pub pause_duration: Duration,
    /// Workout moving time at the end of this chunk
    pub total_duration: Duration,
    /// Moving speed (distance / moving time) in m/s
    pub speed: f64,
    pub elevation: Option<MinMaxAvg>,
    /// Instantaneous speed range in m/s
    pub speed_range: Option<MinMaxAvg>,
    pub cadence: Option<MinMaxAvg>,
    pub heart_rate: Option<MinMaxAvg>,
    pub power: Option<MinMaxAvg>,
    pub total_up: f64,
    pub total_down: f64,
    pub is_best: bool,
    pub is_worst: bool,
}

impl BreakdownItem {
    /// Moving plus stopped time.
    pub fn elapsed(&self) -> Duration {
        self.duration + self.pause_duration
    }
}

/// The chunk currently absorbing points.
#[derive(Debug)]
struct RunningItem {
    counter: usize,
    start_index: usize,
    absorbed: usize,
    distance: f64,
    duration: Duration,
    pause_duration: Duration,
    total_distance: f64,
    total_duration: Duration,
}

impl RunningItem {
    fn first() -> Self {
        Self {
            counter: 1,
            start_index: 0,
            absorbed: 0,
            distance: 0.0,
            duration: Duration::ZERO,
            pause_duration: Duration::ZERO,
            total_distance: 0.0,
            total_duration: Duration::ZERO,
        }
    }

    /// The chunk that follows this one, starting at `index`.
    fn next_at(&self, index: usize) -> Self {
        Self {
            counter: self.counter + 1,
            start_index: index,
            absorbed: 0,
            distance: 0.0,
            duration: Duration::ZERO,
            pause_duration: Duration::ZERO,
            total_distance: self.total_distance,
            total_duration: self.total_duration,
        }
    }

    /// Whether `point` fits without reaching the next unit boundary.
    fn can_absorb(&self, unit: BreakdownUnit, point: &TrackPoint) -> bool {
        match unit {
            BreakdownUnit::Distance(step) => {
                self.total_distance + point.distance < self.counter as f64 * step
            }
            BreakdownUnit::Duration(step) => {
                let moving = if point.is_moving() {
                    point.duration
                } else {
                    Duration::ZERO
                };
                (self.total_duration + moving).as_nanos() < step.as_nanos() * self.counter as u128
            }
        }
    }

    fn absorb(&mut self, point: &TrackPoint) {
        self.absorbed += 1;
        self.distance += point.distance;
        self.total_distance += point.distance;
        if point.is_moving() {
            self.duration += point.duration;
            self.total_duration += point.duration;
        } else {
            self.pause_duration += point.duration;
        }
    }

    fn close<A: RangeStatsAggregator + ?Sized>(
        self,
        end_index: usize,
        points: &[TrackPoint],
        aggregator: &A,
    ) -> Result<BreakdownItem> {
        let stats = aggregator.range_stats(points, self.start_index, end_index)?;
        let secs = self.duration.as_secs_f64();
        let speed = if secs > 0.0 { self.distance / secs } else { 0.0 };

        Ok(BreakdownItem {
            counter: self.counter,
            start_index: self.start_index,
            end_index,
            first_point_time: points[self.start_index].time,
            last_point_time: points[end_index].time,
            distance: self.distance,
            total_distance: self.total_distance,
            duration: self.duration,
            pause_duration: self.pause_duration,
            total_duration: self.total_duration,
            speed,
            elevation: stats.elevation,
            speed_range: stats.speed,
            cadence: stats.cadence,
            heart_rate: stats.heart_rate,
            power: stats.power,
            total_up: stats.total_up,
            total_down: stats.total_down,
            is_best: false,
            is_worst: false,
        })
    }
}

/// Segment a workout using a caller-supplied range aggregator.
///
/// # Errors
/// `NoData` for an empty point sequence, `InvalidUnitSize` for a zero step,
/// and whatever the aggregator reports for a chunk.
pub fn segment_with<A: RangeStatsAggregator + ?Sized>(
    points: &[TrackPoint],
    unit: BreakdownUnit,
    aggregator: &A,
) -> Result<Vec<BreakdownItem>> {
    if points.is_empty() {
        return Err(AnalyticsError::no_data("workout has no points"));
    }
    unit.validate()?;

    let mut items = Vec::new();
    let mut running = RunningItem::first();

    for (i, point) in points.iter().enumerate() {
        let crosses = !running.can_absorb(unit, point);
        running.absorb(point);

        if crosses {
            let next = running.next_at(i);
            let closed = std::mem::replace(&mut running, next);
            items.push(closed.close(i, points, aggregator)?);
        }
    }

    if running.absorbed > 0 {
        items.push(running.close(points.len() - 1, points, aggregator)?);
    }

    if items.is_empty() {
        return Err(AnalyticsError::no_data("breakdown produced no items"));
    }

    mark_best_and_worst(&mut items);

    debug!(
        "[Breakdown] Segmented {} points into {} items ({:?})",
        points.len(),
        items.len(),
        unit
    );

    Ok(items)
}

/// Segment a workout, computing chunk statistics from the points themselves.
pub fn segment(points: &[TrackPoint], unit: BreakdownUnit) -> Result<Vec<BreakdownItem>> {
    segment_with(points, unit, &PointRangeStats)
}

/// Segment a workout from a unit string ("km", "mi", "min", ...) and count.
pub fn breakdown(points: &[TrackPoint], unit: &str, count: f64) -> Result<Vec<BreakdownItem>> {
    segment(points, BreakdownUnit::parse(unit, count)?)
}

/// Flag the fastest and slowest chunk. Ties go to the earliest chunk.
fn mark_best_and_worst(items: &mut [BreakdownItem]) {
    let mut best = 0;
    let mut worst = 0;

    for (i, item) in items.iter().enumerate().skip(1) {
        if item.speed > items[best].speed {
            best = i;
        }
        if item.speed < items[worst].speed {
            worst = i;
        }
    }

    if let Some(item) = items.get_mut(best) {
        item.is_best = true;
    }
    if let Some(item) = items.get_mut(worst) {
        item.is_worst = true;
    }
}
