//! Immutable lookup tables shared by the analytics components.
//!
//! The tables are plain data: build one with [`AnalyticsConfig::default`] or
//! load it from JSON, then pass it by reference. [`AnalyticsConfig::shared`]
//! hands out a read-only default instance.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::units::{METERS_PER_KILOMETER, METERS_PER_MILE};
use crate::WorkoutType;

/// A named target distance ("10 km", "marathon").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceLabel {
    pub label: String,
    /// Target distance in meters
    pub distance: f64,
}

impl DistanceLabel {
    pub fn new(label: &str, distance: f64) -> Self {
        Self {
            label: label.to_string(),
            distance,
        }
    }
}

/// Distance ladders per workout type, in ascending distance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceLabels(BTreeMap<WorkoutType, Vec<DistanceLabel>>);

impl DistanceLabels {
    pub fn new(ladders: BTreeMap<WorkoutType, Vec<DistanceLabel>>) -> Self {
        Self(ladders)
    }

    /// The ladder for a workout type (empty when the type has none).
    pub fn ladder(&self, workout_type: WorkoutType) -> &[DistanceLabel] {
        self.0.get(&workout_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_valid(&self, workout_type: WorkoutType, label: &str) -> bool {
        self.ladder(workout_type).iter().any(|l| l.label == label)
    }

    /// Set of label names valid for a workout type.
    pub fn valid_labels(&self, workout_type: WorkoutType) -> HashSet<&str> {
        self.ladder(workout_type)
            .iter()
            .map(|l| l.label.as_str())
            .collect()
    }

    fn validate(&self) -> Result<()> {
        for (workout_type, ladder) in &self.0 {
            let mut seen = HashSet::new();
            for entry in ladder {
                if !seen.insert(entry.label.as_str()) {
                    return Err(config_error(format!(
                        "duplicate label '{}' for {}",
                        entry.label, workout_type
                    )));
                }
                if !entry.distance.is_finite() || entry.distance <= 0.0 {
                    return Err(config_error(format!(
                        "label '{}' for {} has invalid distance {}",
                        entry.label, workout_type, entry.distance
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for DistanceLabels {
    fn default() -> Self {
        let km = |n: f64| n * METERS_PER_KILOMETER;
        let ladder = |entries: &[(&str, f64)]| -> Vec<DistanceLabel> {
            entries
                .iter()
                .map(|&(label, distance)| DistanceLabel::new(label, distance))
                .collect()
        };

        let on_foot = ladder(&[
            ("1 km", km(1.0)),
            ("5 km", km(5.0)),
            ("10 km", km(10.0)),
            ("20 km", km(20.0)),
            ("30 km", km(30.0)),
            ("50 km", km(50.0)),
        ]);

        let mut ladders = BTreeMap::new();
        ladders.insert(
            WorkoutType::Running,
            ladder(&[
                ("1 km", km(1.0)),
                ("1 mi", METERS_PER_MILE),
                ("3 km", km(3.0)),
                ("5 km", km(5.0)),
                ("10 km", km(10.0)),
                ("15 km", km(15.0)),
                ("10 mi", 10.0 * METERS_PER_MILE),
                ("20 km", km(20.0)),
                ("half marathon", 21_097.5),
                ("30 km", km(30.0)),
                ("marathon", 42_195.0),
            ]),
        );
        ladders.insert(
            WorkoutType::Cycling,
            ladder(&[
                ("5 km", km(5.0)),
                ("10 km", km(10.0)),
                ("20 km", km(20.0)),
                ("40 km", km(40.0)),
                ("50 km", km(50.0)),
                ("100 km", km(100.0)),
                ("100 mi", 100.0 * METERS_PER_MILE),
                ("200 km", km(200.0)),
            ]),
        );
        ladders.insert(WorkoutType::Walking, on_foot.clone());
        ladders.insert(WorkoutType::Hiking, on_foot);
        ladders.insert(
            WorkoutType::Swimming,
            ladder(&[
                ("100 m", 100.0),
                ("200 m", 200.0),
                ("400 m", 400.0),
                ("800 m", 800.0),
                ("1500 m", 1500.0),
            ]),
        );
        ladders.insert(
            WorkoutType::Rowing,
            ladder(&[
                ("500 m", 500.0),
                ("1 km", km(1.0)),
                ("2 km", km(2.0)),
                ("5 km", km(5.0)),
                ("10 km", km(10.0)),
            ]),
        );
        ladders.insert(
            WorkoutType::Skiing,
            ladder(&[("5 km", km(5.0)), ("10 km", km(10.0)), ("20 km", km(20.0))]),
        );

        Self(ladders)
    }
}

/// Fallback baselines used when a user has not recorded their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDefaults {
    /// Maximum heart rate in bpm
    pub max_heart_rate: f64,
    /// Resting heart rate in bpm
    pub rest_heart_rate: f64,
    /// Functional threshold power in watts
    pub ftp: f64,
}

impl Default for ZoneDefaults {
    fn default() -> Self {
        Self {
            max_heart_rate: 200.0,
            rest_heart_rate: 60.0,
            ftp: 200.0,
        }
    }
}

/// Configuration for the analytics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Valid distance labels per workout type.
    pub distance_labels: DistanceLabels,

    /// Baselines used for zone classification when the user has none.
    pub zone_defaults: ZoneDefaults,

    /// Largest page size a ranking query may request.
    /// Default: 100
    pub max_page_size: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            distance_labels: DistanceLabels::default(),
            zone_defaults: ZoneDefaults::default(),
            max_page_size: 100,
        }
    }
}

static SHARED_CONFIG: Lazy<AnalyticsConfig> = Lazy::new(AnalyticsConfig::default);

impl AnalyticsConfig {
    /// Read-only process-wide default configuration.
    pub fn shared() -> &'static AnalyticsConfig {
        &SHARED_CONFIG
    }

    /// Load and validate a configuration from JSON. Missing fields keep
    /// their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AnalyticsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.distance_labels.validate()?;

        let d = &self.zone_defaults;
        for (name, value) in [
            ("max_heart_rate", d.max_heart_rate),
            ("rest_heart_rate", d.rest_heart_rate),
            ("ftp", d.ftp),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(config_error(format!("{} must be positive, got {}", name, value)));
            }
        }

        if self.max_page_size == 0 {
            return Err(config_error("max_page_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn config_error(message: String) -> AnalyticsError {
    AnalyticsError::Config { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladders() {
        let labels = DistanceLabels::default();
        assert!(labels.is_valid(WorkoutType::Running, "10 km"));
        assert!(labels.is_valid(WorkoutType::Running, "marathon"));
        assert!(!labels.is_valid(WorkoutType::Running, "99 km"));
        assert!(!labels.is_valid(WorkoutType::Running, "100 km"));
        assert!(labels.is_valid(WorkoutType::Cycling, "100 km"));
        assert!(AnalyticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_ladders_are_ascending() {
        let labels = DistanceLabels::default();
        for workout_type in WorkoutType::ALL {
            let ladder = labels.ladder(workout_type);
            assert!(ladder.windows(2).all(|w| w[0].distance < w[1].distance));
        }
    }

    #[test]
    fn test_from_json_partial() {
        let config = AnalyticsConfig::from_json(
            r#"{"zone_defaults": {"max_heart_rate": 190, "rest_heart_rate": 50, "ftp": 250}}"#,
        )
        .unwrap();
        assert_eq!(config.zone_defaults.ftp, 250.0);
        assert_eq!(config.max_page_size, 100);
        assert!(config.distance_labels.is_valid(WorkoutType::Cycling, "40 km"));
    }

    #[test]
    fn test_from_json_custom_ladder() {
        let config = AnalyticsConfig::from_json(
            r#"{"distance_labels": {"running": [{"label": "parkrun", "distance": 5000}]}}"#,
        )
        .unwrap();
        assert!(config.distance_labels.is_valid(WorkoutType::Running, "parkrun"));
        assert!(config.distance_labels.ladder(WorkoutType::Cycling).is_empty());
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let err = AnalyticsConfig::from_json(
            r#"{"distance_labels": {"running": [{"label": "x", "distance": 1}, {"label": "x", "distance": 2}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::Config { .. }));

        assert!(AnalyticsConfig::from_json(r#"{"max_page_size": 0}"#).is_err());
        assert!(AnalyticsConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_shared_is_default() {
        assert_eq!(AnalyticsConfig::shared(), &AnalyticsConfig::default());
    }
}
