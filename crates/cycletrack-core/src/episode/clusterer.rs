//! Episode clustering.
//!
//! Maps a reported date to an episode. A new episode is only created when
//! the date is further than the gap threshold from every neighbour:
//!
//! 1. **Covering**: the date lies inside an episode's bounds
//! 2. **Forward**: the next episode starts within the threshold after the date
//! 3. **Backward**: the previous episode ended within the threshold before the date
//!
//! Forward takes precedence over Backward. Otherwise a new episode is created.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Episode, EpisodeId, SubjectId};
use crate::error::Result;
use crate::store::EpisodeStore;

/// Maximum gap in days (inclusive) at which a date still merges.
pub const DEFAULT_GAP_THRESHOLD_DAYS: i64 = 3;

/// Which rule attached a date to an existing episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRule {
    Covering,
    Forward,
    Backward,
}

/// Clustering decision for one reported date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Attach { episode_id: EpisodeId, rule: MergeRule },
    Create,
}

/// The episodes around a reported date.
#[derive(Debug, Clone, Default)]
pub struct Neighbourhood {
    pub covering: Option<Episode>,
    /// Greatest `started_at <= date`
    pub previous: Option<Episode>,
    /// Smallest `started_at > date`
    pub next: Option<Episode>,
}

impl Neighbourhood {
    /// Resolve the neighbourhood from a full episode history.
    pub fn from_episodes(reported: NaiveDate, episodes: &[Episode]) -> Self {
        let covering = episodes
            .iter()
            .filter(|e| e.covers(reported))
            .min_by_key(|e| (e.started_at, e.id))
            .cloned();
        let previous = episodes
            .iter()
            .filter(|e| e.started_at <= reported)
            .max_by_key(|e| (e.started_at, std::cmp::Reverse(e.id)))
            .cloned();
        let next = episodes
            .iter()
            .filter(|e| e.started_at > reported)
            .min_by_key(|e| (e.started_at, e.id))
            .cloned();
        Self {
            covering,
            previous,
            next,
        }
    }

    /// Resolve the neighbourhood through store queries.
    pub fn from_store<S: EpisodeStore + ?Sized>(
        store: &S,
        subject: SubjectId,
        reported: NaiveDate,
    ) -> Result<Self> {
        if let Some(covering) = store.episode_covering(subject, reported)? {
            return Ok(Self {
                covering: Some(covering),
                ..Self::default()
            });
        }
        Ok(Self {
            covering: None,
            previous: store.closest_before(subject, reported)?,
            next: store.closest_after(subject, reported)?,
        })
    }
}

/// Decides merge-vs-create for reported dates.
#[derive(Debug, Clone)]
pub struct EpisodeClusterer {
    /// Inclusive gap threshold in days
    pub gap_threshold_days: i64,
}

impl Default for EpisodeClusterer {
    fn default() -> Self {
        Self {
            gap_threshold_days: DEFAULT_GAP_THRESHOLD_DAYS,
        }
    }
}

impl EpisodeClusterer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(gap_threshold_days: i64) -> Self {
        Self { gap_threshold_days }
    }

    /// Place `reported` against a subject's full episode history.
    pub fn place(&self, reported: NaiveDate, episodes: &[Episode]) -> Placement {
        self.decide(reported, &Neighbourhood::from_episodes(reported, episodes))
    }

    /// Place `reported` given its resolved neighbourhood.
    pub fn decide(&self, reported: NaiveDate, around: &Neighbourhood) -> Placement {
        if let Some(covering) = &around.covering {
            tracing::debug!(%reported, episode_id = covering.id, "date covered by episode");
            return Placement::Attach {
                episode_id: covering.id,
                rule: MergeRule::Covering,
            };
        }

        if let Some(next) = &around.next {
            let days_until_next = (next.started_at - reported).num_days();
            if days_until_next <= self.gap_threshold_days {
                tracing::debug!(%reported, episode_id = next.id, days_until_next, "forward merge");
                return Placement::Attach {
                    episode_id: next.id,
                    rule: MergeRule::Forward,
                };
            }
        }

        let Some(previous) = &around.previous else {
            tracing::debug!(%reported, "no previous episode, creating");
            return Placement::Create;
        };

        let days_since_previous = (reported - previous.last_date).num_days();
        if days_since_previous > self.gap_threshold_days {
            tracing::debug!(%reported, days_since_previous, "gap exceeds threshold, creating");
            Placement::Create
        } else {
            tracing::debug!(%reported, episode_id = previous.id, days_since_previous, "backward merge");
            Placement::Attach {
                episode_id: previous.id,
                rule: MergeRule::Backward,
            }
        }
    }
}
