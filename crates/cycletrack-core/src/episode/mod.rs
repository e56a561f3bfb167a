//! Episodes and the date entries they own.
//!
//! An episode is a contiguous spell of reported dates. Its bounds
//! (`started_at`, `last_date`) are inclusive and always derived from the
//! attached entries via [`recompute_bounds`].

pub mod clusterer;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use clusterer::{EpisodeClusterer, MergeRule, Placement, DEFAULT_GAP_THRESHOLD_DAYS};

pub type SubjectId = i64;
pub type EpisodeId = i64;
pub type DateEntryId = i64;

/// One contiguous menstrual period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub subject_id: SubjectId,
    pub started_at: NaiveDate,
    pub last_date: NaiveDate,
}

impl Episode {
    /// Whether `date` falls within `[started_at, last_date]`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.started_at <= date && date <= self.last_date
    }
}

/// A single reported date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEntry {
    pub id: DateEntryId,
    pub episode_id: EpisodeId,
    pub date: NaiveDate,
}

/// An episode together with its entries, ordered by date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeWithDates {
    #[serde(flatten)]
    pub episode: Episode,
    pub dates: Vec<DateEntry>,
}

/// Result of assigning a reported date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub episode_id: EpisodeId,
    pub date_entry_id: DateEntryId,
    /// True when a new episode was materialized for this date
    pub created: bool,
    /// Which merge rule matched; `None` for a new episode
    pub rule: Option<MergeRule>,
}

/// Min/max over an episode's entry dates.
///
/// Returns `None` for an empty set.
pub fn recompute_bounds<'a, I>(dates: I) -> Option<(NaiveDate, NaiveDate)>
where
    I: IntoIterator<Item = &'a NaiveDate>,
{
    dates.into_iter().fold(None, |acc, &d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}
