pub mod config;
pub mod date;
pub mod episode;
pub mod forecast;
pub mod profile;

use chrono::NaiveDate;
use cycletrack_core::{Config, Database, Tracker};

/// Tracker over the on-disk database, tuned by the user's config.
pub fn open_tracker() -> Result<Tracker<Database>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    tracing::debug!(
        gap_threshold_days = config.clustering.gap_threshold_days,
        horizon = config.forecast.horizon,
        "tracker opened"
    );
    Ok(Tracker::with_parts(db, config.clusterer(), config.forecaster()))
}

/// Parse a `YYYY-MM-DD` argument.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}
