//! Repository traits consumed by the tracker.
//!
//! All queries are scoped to one subject. [`Store::exclusive`] is the
//! per-subject write section the tracker holds around the read-decide-write
//! of date assignment.

use chrono::NaiveDate;

use crate::episode::{DateEntry, DateEntryId, Episode, EpisodeId, SubjectId};
use crate::error::Result;
use crate::profile::Profile;

pub trait EpisodeStore {
    /// All episodes of a subject, newest `started_at` first.
    fn episodes_for_subject(&self, subject: SubjectId) -> Result<Vec<Episode>>;

    /// The `limit` most recent episodes, newest first.
    fn recent_episodes(&self, subject: SubjectId, limit: usize) -> Result<Vec<Episode>>;

    /// Episode whose `[started_at, last_date]` contains `date`.
    fn episode_covering(&self, subject: SubjectId, date: NaiveDate) -> Result<Option<Episode>>;

    /// Episode with the greatest `started_at <= date`.
    fn closest_before(&self, subject: SubjectId, date: NaiveDate) -> Result<Option<Episode>>;

    /// Episode with the smallest `started_at > date`.
    fn closest_after(&self, subject: SubjectId, date: NaiveDate) -> Result<Option<Episode>>;

    fn insert_episode(
        &self,
        subject: SubjectId,
        started_at: NaiveDate,
        last_date: NaiveDate,
    ) -> Result<Episode>;

    fn episode_by_id_and_subject(
        &self,
        id: EpisodeId,
        subject: SubjectId,
    ) -> Result<Option<Episode>>;

    fn update_episode_bounds(
        &self,
        id: EpisodeId,
        started_at: NaiveDate,
        last_date: NaiveDate,
    ) -> Result<()>;
}

pub trait DateEntryStore {
    fn insert_date(&self, episode_id: EpisodeId, date: NaiveDate) -> Result<DateEntry>;

    fn find_by_episode_and_date(
        &self,
        episode_id: EpisodeId,
        date: NaiveDate,
    ) -> Result<Option<DateEntry>>;

    fn delete_date(&self, id: DateEntryId) -> Result<()>;

    fn date_by_id(&self, id: DateEntryId) -> Result<Option<DateEntry>>;

    /// Entries of an episode ordered by date.
    fn dates_for_episode(&self, episode_id: EpisodeId) -> Result<Vec<DateEntry>>;
}

pub trait ProfileReader {
    /// The stored profile, if the subject has one.
    fn profile(&self, subject: SubjectId) -> Result<Option<Profile>>;
}

pub trait ProfileWriter {
    fn save_profile(&self, profile: &Profile) -> Result<()>;
}

/// Full store used by the tracker.
pub trait Store: EpisodeStore + DateEntryStore + ProfileReader + ProfileWriter {
    /// Run `f` while holding the exclusive write section for `subject`.
    ///
    /// Writes made inside `f` are committed when it returns `Ok` and
    /// discarded when it returns `Err`.
    fn exclusive<T, F>(&self, subject: SubjectId, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>;
}
