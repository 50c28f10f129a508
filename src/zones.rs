//! Heart rate and power training zones.
//!
//! This module classifies single samples into zones, builds the absolute zone
//! boundary table for display, and computes time-in-zone over a workout.
//!
//! ## Features
//! - Heart rate zones (5) on heart-rate reserve
//! - Power zones (7) on FTP (Coggan)
//! - Per-point zone tags and time-in-zone distributions
//!
//! Classification and boundaries share one threshold table per zone model.
//!
//! ## Example
//! ```rust
//! use workout_analytics::zones::{heart_rate_zone, power_zone, power_boundaries};
//!
//! assert_eq!(heart_rate_zone(150.0, 190.0, 50.0), 3);
//! assert_eq!(power_zone(310.0, 300.0), 4);
//! assert_eq!(power_boundaries(250.0).len(), 7);
//! ```

use log::warn;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::ZoneDefaults;
use crate::{Metric, TrackPoint};

/// Upper limits of heart rate zones 1-4 as fractions of heart-rate reserve.
/// Zone 5 is everything above.
pub const HEART_RATE_ZONE_LIMITS: [f64; 4] = [0.60, 0.70, 0.80, 0.90];

/// Upper limits of power zones 1-6 as fractions of FTP. Zone 7 is everything above.
pub const POWER_ZONE_LIMITS: [f64; 6] = [0.55, 0.75, 0.90, 1.05, 1.20, 1.50];

/// Zone (1-based) for a ratio against a limits table.
fn zone_for_ratio(ratio: f64, limits: &[f64]) -> u8 {
    let index = limits
        .iter()
        .position(|&limit| ratio < limit)
        .unwrap_or(limits.len());
    (index + 1) as u8
}

/// Absolute boundaries from a limits table: `value(limit)` maps a ratio back
/// to a sample value.
fn boundaries_for(limits: &[f64], value: impl Fn(f64) -> f64) -> Vec<ZoneBoundary> {
    let mut lower = 0.0;
    let mut boundaries = Vec::with_capacity(limits.len() + 1);

    for (i, &limit) in limits.iter().enumerate() {
        let upper = value(limit);
        boundaries.push(ZoneBoundary {
            zone: (i + 1) as u8,
            lower,
            upper: Some(upper),
        });
        lower = upper;
    }
    boundaries.push(ZoneBoundary {
        zone: (limits.len() + 1) as u8,
        lower,
        upper: None,
    });
    boundaries
}

fn baseline_or(value: f64, fallback: f64, name: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        if value != 0.0 {
            warn!("[Zones] Ignoring invalid {} {}, using {}", name, value, fallback);
        }
        fallback
    }
}

/// One zone band in absolute units (bpm or watts).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBoundary {
    /// 1-based zone index
    pub zone: u8,
    pub lower: f64,
    /// `None` for the open-ended top zone
    pub upper: Option<f64>,
}

/// Heart rate zone model on heart-rate reserve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateZones {
    pub max_heart_rate: f64,
    pub rest_heart_rate: f64,
}

impl HeartRateZones {
    /// Build from user baselines; zero or unknown values fall back to
    /// the built-in defaults (max 200, rest 60).
    pub fn new(max_heart_rate: f64, rest_heart_rate: f64) -> Self {
        Self::with_defaults(max_heart_rate, rest_heart_rate, &ZoneDefaults::default())
    }

    pub fn with_defaults(max_heart_rate: f64, rest_heart_rate: f64, defaults: &ZoneDefaults) -> Self {
        Self {
            max_heart_rate: baseline_or(max_heart_rate, defaults.max_heart_rate, "max heart rate"),
            rest_heart_rate: baseline_or(rest_heart_rate, defaults.rest_heart_rate, "rest heart rate"),
        }
    }

    /// Heart-rate reserve, or max heart rate when the reserve is not positive.
    pub fn reserve(&self) -> f64 {
        let reserve = self.max_heart_rate - self.rest_heart_rate;
        if reserve > 0.0 {
            reserve
        } else {
            self.max_heart_rate
        }
    }

    /// Zone (1-5) for a heart rate sample in bpm.
    pub fn zone(&self, heart_rate: f64) -> u8 {
        let percent = (heart_rate - self.rest_heart_rate) / self.reserve();
        zone_for_ratio(percent, &HEART_RATE_ZONE_LIMITS)
    }

    pub fn boundaries(&self) -> Vec<ZoneBoundary> {
        let reserve = self.reserve();
        boundaries_for(&HEART_RATE_ZONE_LIMITS, |limit| {
            self.rest_heart_rate + limit * reserve
        })
    }
}

impl Default for HeartRateZones {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Power zone model on FTP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerZones {
    /// Functional threshold power in watts
    pub ftp: f64,
}

impl PowerZones {
    /// Build from a user's FTP; zero or unknown falls back to 200 W.
    pub fn new(ftp: f64) -> Self {
        Self::with_defaults(ftp, &ZoneDefaults::default())
    }

    pub fn with_defaults(ftp: f64, defaults: &ZoneDefaults) -> Self {
        Self {
            ftp: baseline_or(ftp, defaults.ftp, "FTP"),
        }
    }

    /// Zone (1-7) for a power sample in watts.
    pub fn zone(&self, power: f64) -> u8 {
        zone_for_ratio(power / self.ftp, &POWER_ZONE_LIMITS)
    }

    pub fn boundaries(&self) -> Vec<ZoneBoundary> {
        boundaries_for(&POWER_ZONE_LIMITS, |limit| limit * self.ftp)
    }
}

impl Default for PowerZones {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Heart rate zone (1-5) for a sample, with baseline fallbacks.
pub fn heart_rate_zone(sample: f64, max_heart_rate: f64, rest_heart_rate: f64) -> u8 {
    HeartRateZones::new(max_heart_rate, rest_heart_rate).zone(sample)
}

/// Power zone (1-7) for a sample, with FTP fallback.
pub fn power_zone(sample: f64, ftp: f64) -> u8 {
    PowerZones::new(ftp).zone(sample)
}

/// Heart rate zone table in bpm.
pub fn heart_rate_boundaries(max_heart_rate: f64, rest_heart_rate: f64) -> Vec<ZoneBoundary> {
    HeartRateZones::new(max_heart_rate, rest_heart_rate).boundaries()
}

/// Power zone table in watts.
pub fn power_boundaries(ftp: f64) -> Vec<ZoneBoundary> {
    PowerZones::new(ftp).boundaries()
}

/// A user's recorded baselines as of the workout date. Missing values use
/// the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserBaselines {
    pub max_heart_rate: Option<f64>,
    pub rest_heart_rate: Option<f64>,
    pub ftp: Option<f64>,
}

impl UserBaselines {
    pub fn heart_rate_zones(&self, defaults: &ZoneDefaults) -> HeartRateZones {
        HeartRateZones::with_defaults(
            self.max_heart_rate.unwrap_or(0.0),
            self.rest_heart_rate.unwrap_or(0.0),
            defaults,
        )
    }

    pub fn power_zones(&self, defaults: &ZoneDefaults) -> PowerZones {
        PowerZones::with_defaults(self.ftp.unwrap_or(0.0), defaults)
    }
}

/// Zone tags for one point. `None` where the point has no sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointZones {
    pub heart_rate_zone: Option<u8>,
    pub power_zone: Option<u8>,
}

/// Tag every point with its heart rate and power zone.
pub fn classify_points(
    points: &[TrackPoint],
    baselines: &UserBaselines,
    defaults: &ZoneDefaults,
) -> Vec<PointZones> {
    let hr_zones = baselines.heart_rate_zones(defaults);
    let power_zones = baselines.power_zones(defaults);

    points
        .iter()
        .map(|p| PointZones {
            heart_rate_zone: p.metric(Metric::HeartRate).map(|hr| hr_zones.zone(hr)),
            power_zone: p.metric(Metric::Power).map(|w| power_zones.zone(w)),
        })
        .collect()
}

/// Time spent in each zone over a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDistribution {
    /// Points that carried a sample
    pub total_samples: u32,
    /// Seconds in each zone (index 0 = zone 1)
    pub zone_seconds: Vec<f64>,
    /// Percentage of sampled time in each zone
    pub zone_percentages: Vec<f64>,
    /// Time-weighted average of the samples
    pub average: f64,
    pub peak: f64,
}

impl ZoneDistribution {
    fn empty(zones: usize) -> Self {
        Self {
            total_samples: 0,
            zone_seconds: vec![0.0; zones],
            zone_percentages: vec![0.0; zones],
            average: 0.0,
            peak: 0.0,
        }
    }

    /// Percentage for a zone (1-based); 0 for out-of-range zones.
    pub fn get_zone_percent(&self, zone: u8) -> f64 {
        (zone as usize)
            .checked_sub(1)
            .and_then(|i| self.zone_percentages.get(i))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Partial sums for a distribution: (zone seconds, samples, weighted sum, peak).
type Partial = (Vec<f64>, u32, f64, f64);

fn fold_point(mut acc: Partial, point: &TrackPoint, metric: Metric, zone: &impl Fn(f64) -> u8) -> Partial {
    if let Some(value) = point.metric(metric).filter(|v| v.is_finite()) {
        let secs = point.duration.as_secs_f64();
        acc.0[(zone(value) - 1) as usize] += secs;
        acc.1 += 1;
        acc.2 += value * secs;
        acc.3 = acc.3.max(value);
    }
    acc
}

fn finish_distribution((zone_seconds, samples, weighted, peak): Partial) -> ZoneDistribution {
    let total: f64 = zone_seconds.iter().sum();
    let zone_percentages = zone_seconds
        .iter()
        .map(|s| if total > 0.0 { s / total * 100.0 } else { 0.0 })
        .collect();

    ZoneDistribution {
        total_samples: samples,
        zone_seconds,
        zone_percentages,
        average: if total > 0.0 { weighted / total } else { 0.0 },
        peak,
    }
}

fn distribution(
    points: &[TrackPoint],
    metric: Metric,
    zones: usize,
    zone: impl Fn(f64) -> u8,
) -> ZoneDistribution {
    if points.is_empty() {
        return ZoneDistribution::empty(zones);
    }
    let init: Partial = (vec![0.0; zones], 0, 0.0, 0.0);
    let partial = points
        .iter()
        .fold(init, |acc, p| fold_point(acc, p, metric, &zone));
    finish_distribution(partial)
}

/// Time in each heart rate zone, weighted by point duration.
pub fn heart_rate_distribution(points: &[TrackPoint], zones: &HeartRateZones) -> ZoneDistribution {
    distribution(points, Metric::HeartRate, HEART_RATE_ZONE_LIMITS.len() + 1, |hr| {
        zones.zone(hr)
    })
}

/// Time in each power zone, weighted by point duration.
pub fn power_distribution(points: &[TrackPoint], zones: &PowerZones) -> ZoneDistribution {
    distribution(points, Metric::Power, POWER_ZONE_LIMITS.len() + 1, |w| zones.zone(w))
}

#[cfg(feature = "parallel")]
fn distribution_parallel(
    points: &[TrackPoint],
    metric: Metric,
    zones: usize,
    zone: impl Fn(f64) -> u8 + Sync,
) -> ZoneDistribution {
    if points.len() < 10_000 {
        // Fall back to sequential for small tracks
        return distribution(points, metric, zones, zone);
    }

    let partial = points
        .par_iter()
        .fold(
            || (vec![0.0; zones], 0u32, 0.0f64, 0.0f64),
            |acc, p| fold_point(acc, p, metric, &zone),
        )
        .reduce(
            || (vec![0.0; zones], 0u32, 0.0f64, 0.0f64),
            |(mut z1, n1, w1, p1), (z2, n2, w2, p2)| {
                for (a, b) in z1.iter_mut().zip(z2) {
                    *a += b;
                }
                (z1, n1 + n2, w1 + w2, p1.max(p2))
            },
        );
    finish_distribution(partial)
}

/// Heart rate distribution using parallel processing.
/// More efficient for long tracks (> 10,000 points).
#[cfg(feature = "parallel")]
pub fn heart_rate_distribution_parallel(
    points: &[TrackPoint],
    zones: &HeartRateZones,
) -> ZoneDistribution {
    distribution_parallel(points, Metric::HeartRate, HEART_RATE_ZONE_LIMITS.len() + 1, |hr| {
        zones.zone(hr)
    })
}

/// Power distribution using parallel processing.
#[cfg(feature = "parallel")]
pub fn power_distribution_parallel(points: &[TrackPoint], zones: &PowerZones) -> ZoneDistribution {
    distribution_parallel(points, Metric::Power, POWER_ZONE_LIMITS.len() + 1, |w| zones.zone(w))
}
