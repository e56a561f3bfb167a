//! Per-subject cycle profile.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::episode::SubjectId;
use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub subject_id: SubjectId,
    /// Seed date used when no episodes exist yet
    pub initial_period_date: Option<NaiveDate>,
    /// Explicit expected cycle length in days
    pub menstrual_cycle_duration: Option<u32>,
    pub is_menstrual_cycle_regular: bool,
}

impl Profile {
    /// Profile assumed for a subject that never saved one.
    pub fn empty(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            initial_period_date: None,
            menstrual_cycle_duration: None,
            is_menstrual_cycle_regular: false,
        }
    }
}

/// Partial profile update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub initial_period_date: Option<NaiveDate>,
    pub menstrual_cycle_duration: Option<u32>,
    pub is_menstrual_cycle_regular: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.initial_period_date.is_none()
            && self.menstrual_cycle_duration.is_none()
            && self.is_menstrual_cycle_regular.is_none()
    }

    /// Apply onto `profile`, rejecting a zero cycle duration.
    pub fn apply(&self, profile: &mut Profile) -> Result<()> {
        if let Some(days) = self.menstrual_cycle_duration {
            if days == 0 {
                return Err(ValidationError::InvalidValue {
                    field: "menstrualCycleDuration".into(),
                    message: "must be a positive number of days".into(),
                }
                .into());
            }
            profile.menstrual_cycle_duration = Some(days);
        }
        if let Some(date) = self.initial_period_date {
            profile.initial_period_date = Some(date);
        }
        if let Some(regular) = self.is_menstrual_cycle_regular {
            profile.is_menstrual_cycle_regular = regular;
        }
        Ok(())
    }
}
