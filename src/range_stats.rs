//! Min/max/average statistics over a contiguous range of track points.
//!
//! [`RangeStatsAggregator`] is the seam for whatever computes per-range
//! statistics (a database query, a cached summary). [`PointRangeStats`]
//! computes them directly from the in-memory points.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::{Metric, TrackPoint};

/// Minimum, maximum and mean of one quantity over a range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxAvg {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Aggregates for the points in `[start, end]`.
///
/// A quantity with no samples in the range is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeStats {
    /// Elevation in meters
    pub elevation: Option<MinMaxAvg>,
    /// Instantaneous speed in m/s
    pub speed: Option<MinMaxAvg>,
    pub cadence: Option<MinMaxAvg>,
    pub heart_rate: Option<MinMaxAvg>,
    pub power: Option<MinMaxAvg>,
    pub temperature: Option<MinMaxAvg>,
    /// Summed positive elevation change in meters
    pub total_up: f64,
    /// Summed negative elevation change in meters (positive number)
    pub total_down: f64,
}

/// Computes range statistics for a closed index range of a point sequence.
pub trait RangeStatsAggregator {
    fn range_stats(&self, points: &[TrackPoint], start: usize, end: usize) -> Result<RangeStats>;
}

/// Aggregator that scans the points directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointRangeStats;

impl RangeStatsAggregator for PointRangeStats {
    fn range_stats(&self, points: &[TrackPoint], start: usize, end: usize) -> Result<RangeStats> {
        check_range(points.len(), start, end)?;

        let mut elevation = Accumulator::default();
        let mut speed = Accumulator::default();
        let mut cadence = Accumulator::default();
        let mut heart_rate = Accumulator::default();
        let mut power = Accumulator::default();
        let mut temperature = Accumulator::default();
        let mut total_up = 0.0;
        let mut total_down = 0.0;

        for (i, point) in points[start..=end].iter().enumerate() {
            elevation.push(Some(point.elevation));
            if !point.duration.is_zero() {
                speed.push(Some(point.speed()));
            }
            cadence.push(point.metric(Metric::Cadence));
            heart_rate.push(point.metric(Metric::HeartRate));
            power.push(point.metric(Metric::Power));
            temperature.push(point.metric(Metric::Temperature));

            if i > 0 {
                let delta = point.elevation - points[start + i - 1].elevation;
                if delta > 0.0 {
                    total_up += delta;
                } else {
                    total_down -= delta;
                }
            }
        }

        Ok(RangeStats {
            elevation: elevation.finish(),
            speed: speed.finish(),
            cadence: cadence.finish(),
            heart_rate: heart_rate.finish(),
            power: power.finish(),
            temperature: temperature.finish(),
            total_up,
            total_down,
        })
    }
}

/// Validate a closed index range against a sequence length.
pub(crate) fn check_range(len: usize, start: usize, end: usize) -> Result<()> {
    if start > end || end >= len {
        return Err(AnalyticsError::InvalidRange { start, end, len });
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            return;
        };
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    fn finish(self) -> Option<MinMaxAvg> {
        (self.count > 0).then(|| MinMaxAvg {
            min: self.min,
            max: self.max,
            avg: self.sum / self.count as f64,
        })
    }
}
