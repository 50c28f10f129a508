//! Best-first, paginated leaderboards over a user's history.
//!
//! Distance leaderboards rank every interval effort for one label; climb
//! leaderboards rank each workout's biggest climb. Both orders are total, so
//! the same input always yields the same page.

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::records::{
    compare_by, DistanceRecord, IntervalRecord, WorkoutClimb, CLIMB_RANKING_ORDER, RANKING_ORDER,
};
use crate::WorkoutType;

/// Inclusive calendar date filter. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        let day = date.date_naive();
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    fn validate(&self, config: &AnalyticsConfig) -> Result<()> {
        if self.page == 0 || self.page_size == 0 || self.page_size > config.max_page_size {
            return Err(AnalyticsError::InvalidPage {
                page: self.page,
                page_size: self.page_size,
            });
        }
        Ok(())
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPage<T> {
    pub records: Vec<T>,
    /// Number of matching entries across all pages
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> RankedPage<T> {
    fn from_sorted<S>(sorted: Vec<S>, page: PageRequest, map: impl Fn(S) -> T) -> Self {
        let total_count = sorted.len();
        let records = sorted
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .map(map)
            .collect();
        Self {
            records,
            total_count,
            page: page.page,
            page_size: page.page_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Distance leaderboard request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankQuery {
    pub label: String,
    pub workout_type: WorkoutType,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub page: PageRequest,
}

impl RankQuery {
    pub fn new(label: &str, workout_type: WorkoutType) -> Self {
        Self {
            label: label.to_string(),
            workout_type,
            date_range: DateRange::default(),
            page: PageRequest::default(),
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = PageRequest::new(page, page_size);
        self
    }
}

/// Rank every effort for a label, fastest first.
///
/// # Errors
/// `UnknownLabel` if the label is not on the workout type's ladder,
/// `InvalidPage` for page 0 or an out-of-bounds page size. A query that
/// matches nothing returns an empty page with `total_count == 0`.
pub fn rank_distance(
    rows: &[IntervalRecord],
    query: &RankQuery,
    config: &AnalyticsConfig,
) -> Result<RankedPage<DistanceRecord>> {
    if !config
        .distance_labels
        .is_valid(query.workout_type, &query.label)
    {
        return Err(AnalyticsError::UnknownLabel {
            label: query.label.clone(),
            workout_type: query.workout_type.to_string(),
        });
    }
    query.page.validate(config)?;

    let mut matching: Vec<&IntervalRecord> = rows
        .iter()
        .filter(|r| {
            r.workout_type == query.workout_type
                && r.label == query.label
                && r.qualifies()
                && query.date_range.contains(r.workout_date)
        })
        .collect();
    matching.sort_by(|a, b| compare_by(RANKING_ORDER, *a, *b));

    debug!(
        "[Ranking] {} '{}': {} matching efforts",
        query.workout_type,
        query.label,
        matching.len()
    );

    Ok(RankedPage::from_sorted(matching, query.page, DistanceRecord::from))
}

/// Climb leaderboard request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimbQuery {
    pub workout_type: WorkoutType,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub page: PageRequest,
}

impl ClimbQuery {
    pub fn new(workout_type: WorkoutType) -> Self {
        Self {
            workout_type,
            date_range: DateRange::default(),
            page: PageRequest::default(),
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = PageRequest::new(page, page_size);
        self
    }
}

/// Rank workouts by their biggest climb, largest gain first. Only active
/// climbs with a positive gain are eligible.
pub fn rank_climbs(
    rows: &[WorkoutClimb],
    query: &ClimbQuery,
    config: &AnalyticsConfig,
) -> Result<RankedPage<WorkoutClimb>> {
    query.page.validate(config)?;

    let mut matching: Vec<&WorkoutClimb> = rows
        .iter()
        .filter(|r| {
            r.workout_type == query.workout_type
                && r.climb.active
                && r.climb.gain > 0.0
                && query.date_range.contains(r.date)
        })
        .collect();
    matching.sort_by(|a, b| compare_by(CLIMB_RANKING_ORDER, *a, *b));

    debug!(
        "[Ranking] {} climbs: {} eligible workouts",
        query.workout_type,
        matching.len()
    );

    Ok(RankedPage::from_sorted(matching, query.page, |climb| climb.clone()))
}
