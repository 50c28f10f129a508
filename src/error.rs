//! Unified error handling for the workout analytics engine.
//!
//! Every fallible operation returns [`Result`]. Errors fall into two groups:
//! malformed input (reported, never silently corrected) and "no data", which
//! callers can tell apart with [`AnalyticsError::is_no_data`].

use thiserror::Error;

/// Unified error type for analytics operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    /// Input was well-formed but produced nothing to work with
    #[error("No data: {reason}")]
    NoData { reason: String },

    /// Breakdown unit size converted to zero, a negative value or NaN
    #[error("Invalid unit size {size} for unit '{unit}'")]
    InvalidUnitSize { unit: String, size: f64 },

    /// Breakdown unit string not recognised
    #[error("Unknown unit '{unit}'")]
    UnknownUnit { unit: String },

    /// Workout type name not recognised
    #[error("Unknown workout type '{name}'")]
    UnknownWorkoutType { name: String },

    /// Distance label is not part of the ladder for this workout type
    #[error("Unknown label '{label}' for workout type '{workout_type}'")]
    UnknownLabel { label: String, workout_type: String },

    /// Index range is reversed or falls outside the point sequence
    #[error("Invalid range [{start}, {end}] for {len} points")]
    InvalidRange { start: usize, end: usize, len: usize },

    /// Page number or page size outside the accepted bounds
    #[error("Invalid page {page} (page size {page_size})")]
    InvalidPage { page: usize, page_size: usize },

    /// Statistics period name not recognised
    #[error("Unknown statistics period '{name}'")]
    UnknownPeriod { name: String },

    /// "since" filter could not be parsed
    #[error("Invalid since filter '{value}'")]
    InvalidSince { value: String },

    /// Configuration failed to load or validate
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl AnalyticsError {
    pub(crate) fn no_data(reason: impl Into<String>) -> Self {
        AnalyticsError::NoData {
            reason: reason.into(),
        }
    }

    /// True when the input was valid but legitimately produced no results.
    pub fn is_no_data(&self) -> bool {
        matches!(self, AnalyticsError::NoData { .. })
    }

    /// True when the input itself was rejected as malformed.
    pub fn is_invalid_input(&self) -> bool {
        !self.is_no_data()
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Extension trait for converting Option to AnalyticsError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a no-data error.
    fn ok_or_no_data(self, reason: &str) -> Result<T>;

    /// Convert Option to Result with an invalid range error.
    fn ok_or_invalid_range(self, start: usize, end: usize, len: usize) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_no_data(self, reason: &str) -> Result<T> {
        self.ok_or_else(|| AnalyticsError::no_data(reason))
    }

    fn ok_or_invalid_range(self, start: usize, end: usize, len: usize) -> Result<T> {
        self.ok_or(AnalyticsError::InvalidRange { start, end, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalyticsError::UnknownLabel {
            label: "99 km".to_string(),
            workout_type: "running".to_string(),
        };
        assert!(err.to_string().contains("99 km"));
        assert!(err.to_string().contains("running"));
    }

    #[test]
    fn test_no_data_is_distinguishable() {
        let empty = AnalyticsError::no_data("no points");
        let bad = AnalyticsError::UnknownUnit {
            unit: "furlong".to_string(),
        };
        assert!(empty.is_no_data());
        assert!(!empty.is_invalid_input());
        assert!(bad.is_invalid_input());
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_invalid_range(3, 1, 10),
            Err(AnalyticsError::InvalidRange { start: 3, end: 1, len: 10 })
        ));
        assert!(none.ok_or_no_data("empty").unwrap_err().is_no_data());
    }
}
