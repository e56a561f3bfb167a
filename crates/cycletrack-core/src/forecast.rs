//! Cycle-length estimation and period forecasting.
//!
//! The effective cycle length comes from a [`CycleStrategy`] chosen once per
//! forecast from the profile:
//!
//! - **Regular**: the explicit duration, or the default cycle length
//! - **Irregular**: an average over the gaps between up to four most recent
//!   episode starts, padded with the explicit (or default) length when
//!   history is short
//!
//! Future periods are projected from the anchor (most recent known start)
//! in whole multiples of the floored cycle length.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, TrackingError, ValidationError};
use crate::profile::Profile;

pub const DEFAULT_CYCLE_DAYS: u32 = 28;
pub const DEFAULT_HORIZON: usize = 12;
pub const DEFAULT_OVULATION_OFFSET_DAYS: i64 = 14;
/// Most recent episode starts considered by the irregular strategy.
pub const HISTORY_WINDOW: usize = 4;

/// How the effective cycle length is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleStrategy {
    Regular { explicit_days: Option<u32> },
    /// `history` holds start dates, most recent first
    Irregular {
        explicit_days: Option<u32>,
        history: Vec<NaiveDate>,
    },
}

impl CycleStrategy {
    pub fn from_flag(
        is_regular: bool,
        explicit_days: Option<u32>,
        history_desc: &[NaiveDate],
    ) -> Self {
        if is_regular {
            CycleStrategy::Regular { explicit_days }
        } else {
            CycleStrategy::Irregular {
                explicit_days,
                history: history_desc.iter().take(HISTORY_WINDOW).copied().collect(),
            }
        }
    }

    /// Estimated cycle length in (possibly fractional) days.
    ///
    /// # Errors
    /// `NotEnoughData` when the irregular strategy has fewer than two points.
    pub fn cycle_length(&self, default_days: u32) -> Result<f64> {
        let default_days = f64::from(default_days);
        match self {
            CycleStrategy::Regular { explicit_days } => {
                Ok(explicit_days.map(f64::from).unwrap_or(default_days))
            }
            CycleStrategy::Irregular {
                explicit_days,
                history,
            } => {
                let pad = explicit_days.map(f64::from).unwrap_or(default_days);
                let gap = |i: usize| (history[i] - history[i + 1]).num_days() as f64;
                match history.len() {
                    0 | 1 => Err(TrackingError::NotEnoughData.into()),
                    2 => Ok((gap(0) + pad + pad) / 3.0),
                    3 => Ok((gap(0) + gap(1) + pad) / 3.0),
                    _ => Ok((gap(0) + gap(1) + gap(2)) / 3.0),
                }
            }
        }
    }
}

/// Effective cycle length for the given profile hints and history.
pub fn effective_cycle_length(
    explicit_days: Option<u32>,
    is_regular: bool,
    history_desc: &[NaiveDate],
) -> Result<f64> {
    CycleStrategy::from_flag(is_regular, explicit_days, history_desc).cycle_length(DEFAULT_CYCLE_DAYS)
}

fn out_of_range(field: &str, message: String) -> CoreError {
    ValidationError::InvalidValue {
        field: field.into(),
        message,
    }
    .into()
}

/// `anchor + cycle_days * i` for `i = 1..=count`.
///
/// # Errors
/// `InvalidValue` when a projected date falls outside the calendar range.
pub fn project(anchor: NaiveDate, cycle_days: i64, count: usize) -> Result<Vec<NaiveDate>> {
    (1..=count as i64)
        .map(|i| {
            cycle_days
                .checked_mul(i)
                .and_then(Duration::try_days)
                .and_then(|offset| anchor.checked_add_signed(offset))
                .ok_or_else(|| {
                    out_of_range(
                        "cycle_length",
                        format!("{cycle_days} days x {i} from {anchor} is out of range"),
                    )
                })
        })
        .collect()
}

/// Each period date shifted back by `offset_days`.
///
/// # Errors
/// `InvalidValue` when a shifted date falls outside the calendar range.
pub fn ovulation_dates(periods: &[NaiveDate], offset_days: i64) -> Result<Vec<NaiveDate>> {
    periods
        .iter()
        .map(|&date| {
            Duration::try_days(offset_days)
                .and_then(|offset| date.checked_sub_signed(offset))
                .ok_or_else(|| {
                    out_of_range(
                        "ovulation_offset_days",
                        format!("{date} minus {offset_days} days is out of range"),
                    )
                })
        })
        .collect()
}

/// Projected periods and ovulation dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub anchor: NaiveDate,
    pub cycle_length_days: i64,
    pub period_dates: Vec<NaiveDate>,
    pub ovulation_dates: Vec<NaiveDate>,
}

/// Forecast settings.
#[derive(Debug, Clone)]
pub struct CycleForecaster {
    pub default_cycle_days: u32,
    pub horizon: usize,
    pub ovulation_offset_days: i64,
    pub history_window: usize,
}

impl Default for CycleForecaster {
    fn default() -> Self {
        Self {
            default_cycle_days: DEFAULT_CYCLE_DAYS,
            horizon: DEFAULT_HORIZON,
            ovulation_offset_days: DEFAULT_OVULATION_OFFSET_DAYS,
            history_window: HISTORY_WINDOW,
        }
    }
}

impl CycleForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forecast from a profile and episode starts (most recent first).
    ///
    /// When fewer than `history_window` starts are known, the profile's
    /// seed date is appended as the oldest point.
    ///
    /// # Errors
    /// - `NotEnoughData` with neither history nor seed date, or with fewer
    ///   than two points in irregular mode
    /// - `InvalidValue` when the floored cycle length is below one day
    pub fn forecast(&self, profile: &Profile, history_desc: &[NaiveDate]) -> Result<Forecast> {
        let window = self.history_window.min(HISTORY_WINDOW);
        let mut points: Vec<NaiveDate> = history_desc.iter().take(window).copied().collect();
        if points.len() < window {
            if let Some(seed) = profile.initial_period_date {
                points.push(seed);
            }
        }

        let Some(&anchor) = points.first() else {
            return Err(TrackingError::NotEnoughData.into());
        };

        let strategy = CycleStrategy::from_flag(
            profile.is_menstrual_cycle_regular,
            profile.menstrual_cycle_duration,
            &points,
        );
        let cycle_length_days = strategy.cycle_length(self.default_cycle_days)?.floor() as i64;
        if cycle_length_days < 1 {
            return Err(ValidationError::InvalidValue {
                field: "cycle_length".into(),
                message: format!("estimated cycle length {cycle_length_days} is not positive"),
            }
            .into());
        }

        let period_dates = project(anchor, cycle_length_days, self.horizon)?;
        let ovulation_dates = ovulation_dates(&period_dates, self.ovulation_offset_days)?;
        tracing::debug!(%anchor, cycle_length_days, points = points.len(), "forecast computed");

        Ok(Forecast {
            anchor,
            cycle_length_days,
            period_dates,
            ovulation_dates,
        })
    }
}
