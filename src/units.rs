//! Unit parsing and conversions.
//!
//! Breakdown requests arrive as a unit string plus a count ("km", 1.0). They
//! are canonicalised here to meters or a [`Duration`] before segmentation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Points slower than this are treated as stopped.
pub const PAUSE_SPEED_THRESHOLD_KMH: f64 = 1.0;

pub const METERS_PER_KILOMETER: f64 = 1000.0;
pub const METERS_PER_MILE: f64 = 1609.344;

const KMH_PER_MPS: f64 = 3.6;

/// A canonical breakdown step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakdownUnit {
    /// Step size in meters
    Distance(f64),
    /// Step size as moving time
    Duration(Duration),
}

impl BreakdownUnit {
    /// Parse a unit string and count into a canonical step.
    ///
    /// Accepted units: `m`, `km`, `mi`, `sec`, `min`, `hour`.
    pub fn parse(unit: &str, count: f64) -> Result<Self> {
        let invalid = || AnalyticsError::InvalidUnitSize {
            unit: unit.to_string(),
            size: count,
        };
        if !count.is_finite() || count <= 0.0 {
            return Err(invalid());
        }

        let step = match unit.trim() {
            "m" => BreakdownUnit::Distance(count),
            "km" => BreakdownUnit::Distance(count * METERS_PER_KILOMETER),
            "mi" => BreakdownUnit::Distance(count * METERS_PER_MILE),
            "sec" => BreakdownUnit::Duration(seconds(count).ok_or_else(invalid)?),
            "min" => BreakdownUnit::Duration(seconds(count * 60.0).ok_or_else(invalid)?),
            "hour" => BreakdownUnit::Duration(seconds(count * 3600.0).ok_or_else(invalid)?),
            _ => {
                return Err(AnalyticsError::UnknownUnit {
                    unit: unit.to_string(),
                })
            }
        };

        step.validate()?;
        Ok(step)
    }

    /// Reject steps that round to nothing.
    pub fn validate(&self) -> Result<()> {
        match *self {
            BreakdownUnit::Distance(meters) if meters.is_finite() && meters > 0.0 => Ok(()),
            BreakdownUnit::Duration(d) if !d.is_zero() => Ok(()),
            BreakdownUnit::Distance(meters) => Err(AnalyticsError::InvalidUnitSize {
                unit: "m".to_string(),
                size: meters,
            }),
            BreakdownUnit::Duration(d) => Err(AnalyticsError::InvalidUnitSize {
                unit: "sec".to_string(),
                size: d.as_secs_f64(),
            }),
        }
    }
}

fn seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Convert m/s to km/h.
pub fn mps_to_kmh(speed: f64) -> f64 {
    speed * KMH_PER_MPS
}

/// Convert km/h to m/s.
pub fn kmh_to_mps(speed: f64) -> f64 {
    speed / KMH_PER_MPS
}
