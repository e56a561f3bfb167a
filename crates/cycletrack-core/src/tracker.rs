//! Tracker service.
//!
//! Thin layer that composes the [`EpisodeClusterer`] and [`CycleForecaster`]
//! over a [`Store`]. Date assignment runs its whole read-decide-write
//! sequence inside [`Store::exclusive`], so at most one ingestion per
//! subject is in flight.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::episode::{
    recompute_bounds, Assignment, DateEntryId, Episode, EpisodeClusterer, EpisodeWithDates,
    Placement, SubjectId,
};
use crate::episode::clusterer::Neighbourhood;
use crate::error::{Result, TrackingError, ValidationError};
use crate::forecast::{CycleForecaster, Forecast};
use crate::profile::{Profile, ProfileUpdate};
use crate::store::{DateEntryStore, EpisodeStore, ProfileReader, ProfileWriter, Store};

/// Calendar filter for episode listings, matched against `started_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl EpisodeFilter {
    fn validate(&self) -> Result<()> {
        match (self.year, self.month) {
            (None, Some(_)) => Err(ValidationError::InvalidValue {
                field: "month".into(),
                message: "a month filter needs a year".into(),
            }
            .into()),
            (_, Some(m)) if !(1..=12).contains(&m) => Err(ValidationError::InvalidValue {
                field: "month".into(),
                message: format!("{m} is not a calendar month"),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn matches(&self, episode: &Episode) -> bool {
        self.year.map_or(true, |y| episode.started_at.year() == y)
            && self.month.map_or(true, |m| episode.started_at.month() == m)
    }
}

pub struct Tracker<S> {
    store: S,
    clusterer: EpisodeClusterer,
    forecaster: CycleForecaster,
}

impl<S: Store> Tracker<S> {
    pub fn new(store: S) -> Self {
        Self::with_parts(store, EpisodeClusterer::default(), CycleForecaster::default())
    }

    pub fn with_parts(store: S, clusterer: EpisodeClusterer, forecaster: CycleForecaster) -> Self {
        Self {
            store,
            clusterer,
            forecaster,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate `date` against `today`, then assign it.
    ///
    /// # Errors
    /// `FutureDate` when `date > today`, otherwise as [`Tracker::assign`].
    pub fn record_date(
        &self,
        subject: SubjectId,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Assignment> {
        if date > today {
            return Err(ValidationError::FutureDate { date, today }.into());
        }
        self.assign(subject, date)
    }

    /// Attach `reported` to an episode, creating one if no neighbour is
    /// within the gap threshold.
    ///
    /// The target episode's bounds are recomputed from its entries after
    /// the insert.
    ///
    /// # Errors
    /// `DateAlreadyExists` if the target episode already holds `reported`.
    pub fn assign(&self, subject: SubjectId, reported: NaiveDate) -> Result<Assignment> {
        self.store.exclusive(subject, |store| {
            let around = Neighbourhood::from_store(store, subject, reported)?;
            let placement = self.clusterer.decide(reported, &around);

            let (episode_id, rule) = match placement {
                Placement::Attach { episode_id, rule } => (episode_id, Some(rule)),
                Placement::Create => {
                    let episode = store.insert_episode(subject, reported, reported)?;
                    tracing::info!(subject, episode_id = episode.id, %reported, "episode created");
                    (episode.id, None)
                }
            };

            if store.find_by_episode_and_date(episode_id, reported)?.is_some() {
                return Err(TrackingError::DateAlreadyExists {
                    episode_id,
                    date: reported,
                }
                .into());
            }
            let entry = store.insert_date(episode_id, reported)?;

            if rule.is_some() {
                let dates: Vec<NaiveDate> = store
                    .dates_for_episode(episode_id)?
                    .into_iter()
                    .map(|e| e.date)
                    .collect();
                if let Some((started_at, last_date)) = recompute_bounds(&dates) {
                    store.update_episode_bounds(episode_id, started_at, last_date)?;
                }
            }

            Ok(Assignment {
                episode_id,
                date_entry_id: entry.id,
                created: rule.is_none(),
                rule,
            })
        })
    }

    /// Delete a date entry owned by `subject`. The episode is kept even
    /// when it becomes empty.
    ///
    /// # Errors
    /// `DateNotFound` for an unknown id, `NotOwned` when the entry's
    /// episode belongs to another subject.
    pub fn remove_date(&self, id: DateEntryId, subject: SubjectId) -> Result<()> {
        self.store.exclusive(subject, |store| {
            let entry = store
                .date_by_id(id)?
                .ok_or(TrackingError::DateNotFound { id })?;
            if store
                .episode_by_id_and_subject(entry.episode_id, subject)?
                .is_none()
            {
                return Err(TrackingError::NotOwned { id }.into());
            }
            store.delete_date(id)?;
            tracing::info!(subject, id, episode_id = entry.episode_id, "date entry removed");
            Ok(())
        })
    }

    /// Stored profile, or the empty profile when none was saved.
    pub fn profile(&self, subject: SubjectId) -> Result<Profile> {
        Ok(self
            .store
            .profile(subject)?
            .unwrap_or_else(|| Profile::empty(subject)))
    }

    /// Merge `update` into the subject's profile and persist it.
    pub fn update_profile(&self, subject: SubjectId, update: &ProfileUpdate) -> Result<Profile> {
        let mut profile = self.profile(subject)?;
        if update.is_empty() {
            return Ok(profile);
        }
        update.apply(&mut profile)?;
        self.store.save_profile(&profile)?;
        Ok(profile)
    }

    /// Forecast the next periods from the most recent episode starts.
    pub fn forecast(&self, subject: SubjectId) -> Result<Forecast> {
        let profile = self.profile(subject)?;
        let history: Vec<NaiveDate> = self
            .store
            .recent_episodes(subject, self.forecaster.history_window)?
            .into_iter()
            .map(|e| e.started_at)
            .collect();
        self.forecaster.forecast(&profile, &history)
    }

    /// Episodes newest first, with their dates.
    pub fn episodes(
        &self,
        subject: SubjectId,
        filter: EpisodeFilter,
    ) -> Result<Vec<EpisodeWithDates>> {
        filter.validate()?;
        self.store
            .episodes_for_subject(subject)?
            .into_iter()
            .filter(|e| filter.matches(e))
            .map(|episode| -> Result<EpisodeWithDates> {
                let dates = self.store.dates_for_episode(episode.id)?;
                Ok(EpisodeWithDates { episode, dates })
            })
            .collect()
    }

    /// The most recent episode.
    ///
    /// # Errors
    /// `NoEpisodes` when the subject has none.
    pub fn last_episode(&self, subject: SubjectId) -> Result<EpisodeWithDates> {
        let episode = self
            .store
            .recent_episodes(subject, 1)?
            .into_iter()
            .next()
            .ok_or(TrackingError::NoEpisodes)?;
        let dates = self.store.dates_for_episode(episode.id)?;
        Ok(EpisodeWithDates { episode, dates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::MergeRule;
    use crate::error::CoreError;
    use crate::storage::Database;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tracker() -> Tracker<Database> {
        Tracker::new(Database::open_memory().unwrap())
    }

    fn episode(t: &Tracker<Database>, id: i64) -> Episode {
        t.store().episode_by_id_and_subject(id, 1).unwrap().unwrap()
    }

    #[test]
    fn first_date_creates_episode() {
        let t = tracker();
        let a = t.assign(1, d("2024-07-20")).unwrap();
        assert!(a.created);
        assert_eq!(a.rule, None);
        let ep = episode(&t, a.episode_id);
        assert_eq!((ep.started_at, ep.last_date), (d("2024-07-20"), d("2024-07-20")));
    }

    #[test]
    fn backward_merge_extends_last_date() {
        let t = tracker();
        let first = t.assign(1, d("2024-07-20")).unwrap();
        let second = t.assign(1, d("2024-07-23")).unwrap();
        assert_eq!(second.episode_id, first.episode_id);
        assert_eq!(second.rule, Some(MergeRule::Backward));
        assert_eq!(episode(&t, first.episode_id).last_date, d("2024-07-23"));

        // Extended bounds now cover the gap day.
        let covered = t.assign(1, d("2024-07-21")).unwrap();
        assert_eq!(covered.rule, Some(MergeRule::Covering));
    }

    #[test]
    fn forward_merge_moves_started_at_back() {
        let t = tracker();
        let first = t.assign(1, d("2024-07-20")).unwrap();
        let early = t.assign(1, d("2024-07-17")).unwrap();
        assert_eq!(early.episode_id, first.episode_id);
        assert_eq!(early.rule, Some(MergeRule::Forward));
        let ep = episode(&t, first.episode_id);
        assert_eq!((ep.started_at, ep.last_date), (d("2024-07-17"), d("2024-07-20")));
    }

    #[test]
    fn gap_of_four_starts_new_episode() {
        let t = tracker();
        let first = t.assign(1, d("2024-07-20")).unwrap();
        let second = t.assign(1, d("2024-07-24")).unwrap();
        assert!(second.created);
        assert_ne!(second.episode_id, first.episode_id);
    }

    #[test]
    fn duplicate_date_is_rejected() {
        let t = tracker();
        let first = t.assign(1, d("2024-07-20")).unwrap();
        let err = t.assign(1, d("2024-07-20")).unwrap_err();
        assert_eq!(
            err.tracking(),
            Some(&TrackingError::DateAlreadyExists {
                episode_id: first.episode_id,
                date: d("2024-07-20")
            })
        );
        assert_eq!(t.store().dates_for_episode(first.episode_id).unwrap().len(), 1);
    }

    #[test]
    fn subjects_do_not_share_episodes() {
        let t = tracker();
        let mine = t.assign(1, d("2024-07-20")).unwrap();
        let theirs = t.assign(2, d("2024-07-21")).unwrap();
        assert!(theirs.created);
        assert_ne!(mine.episode_id, theirs.episode_id);
    }

    #[test]
    fn future_dates_are_rejected() {
        let t = tracker();
        let err = t
            .record_date(1, d("2024-07-21"), d("2024-07-20"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::FutureDate { .. })
        ));
        assert!(t.record_date(1, d("2024-07-20"), d("2024-07-20")).is_ok());
    }

    #[test]
    fn remove_date_checks_existence_and_ownership() {
        let t = tracker();
        let a = t.assign(1, d("2024-07-20")).unwrap();

        let missing = t.remove_date(999, 1).unwrap_err();
        assert_eq!(missing.tracking(), Some(&TrackingError::DateNotFound { id: 999 }));

        let foreign = t.remove_date(a.date_entry_id, 2).unwrap_err();
        assert_eq!(
            foreign.tracking(),
            Some(&TrackingError::NotOwned { id: a.date_entry_id })
        );

        t.remove_date(a.date_entry_id, 1).unwrap();
        assert!(t.store().date_by_id(a.date_entry_id).unwrap().is_none());
        // Episode stays in place.
        assert_eq!(episode(&t, a.episode_id).started_at, d("2024-07-20"));
    }

    #[test]
    fn forecast_uses_recent_episode_starts() {
        let t = tracker();
        t.assign(1, d("2024-07-03")).unwrap();
        t.assign(1, d("2024-08-01")).unwrap();
        let forecast = t.forecast(1).unwrap();
        assert_eq!(forecast.anchor, d("2024-08-01"));
        assert_eq!(forecast.cycle_length_days, 28);
        assert_eq!(forecast.period_dates.len(), 12);
    }

    #[test]
    fn forecast_without_data_fails() {
        let t = tracker();
        let err = t.forecast(1).unwrap_err();
        assert_eq!(err.tracking(), Some(&TrackingError::NotEnoughData));
    }

    #[test]
    fn profile_update_is_partial() {
        let t = tracker();
        t.update_profile(
            1,
            &ProfileUpdate {
                menstrual_cycle_duration: Some(30),
                ..Default::default()
            },
        )
        .unwrap();
        let profile = t
            .update_profile(
                1,
                &ProfileUpdate {
                    is_menstrual_cycle_regular: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(profile.menstrual_cycle_duration, Some(30));
        assert!(profile.is_menstrual_cycle_regular);
        assert_eq!(
            t.forecast(1).err().and_then(|e| e.tracking().cloned()),
            Some(TrackingError::NotEnoughData)
        );
    }

    #[test]
    fn episodes_filter_by_year_and_month() {
        let t = tracker();
        t.assign(1, d("2024-06-02")).unwrap();
        t.assign(1, d("2024-07-01")).unwrap();
        t.assign(1, d("2024-07-02")).unwrap();
        t.assign(1, d("2023-07-10")).unwrap();

        let all = t.episodes(1, EpisodeFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].episode.started_at, d("2024-07-01"));
        assert_eq!(all[0].dates.len(), 2);

        let july = t
            .episodes(1, EpisodeFilter { year: Some(2024), month: Some(7) })
            .unwrap();
        assert_eq!(july.len(), 1);

        let year = t
            .episodes(1, EpisodeFilter { year: Some(2024), month: None })
            .unwrap();
        assert_eq!(year.len(), 2);

        assert!(t
            .episodes(1, EpisodeFilter { year: None, month: Some(7) })
            .is_err());
    }

    #[test]
    fn last_episode_requires_history() {
        let t = tracker();
        assert_eq!(
            t.last_episode(1).unwrap_err().tracking(),
            Some(&TrackingError::NoEpisodes)
        );
        t.assign(1, d("2024-06-02")).unwrap();
        t.assign(1, d("2024-07-01")).unwrap();
        assert_eq!(t.last_episode(1).unwrap().episode.started_at, d("2024-07-01"));
    }
}
