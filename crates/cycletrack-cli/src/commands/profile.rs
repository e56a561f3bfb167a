//! Cycle profile commands.

use chrono::NaiveDate;
use clap::Subcommand;
use cycletrack_core::ProfileUpdate;

use super::{open_tracker, parse_date};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the current profile
    Show,
    /// Update profile fields; omitted fields are kept
    Set {
        /// Seed date used before any episode is recorded
        #[arg(long, value_parser = parse_date)]
        initial_period_date: Option<NaiveDate>,
        /// Expected cycle length in days
        #[arg(long)]
        cycle_duration: Option<u32>,
        /// Whether the cycle is regular
        #[arg(long)]
        regular: Option<bool>,
    },
}

pub fn run(subject: i64, action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker()?;

    let profile = match action {
        ProfileAction::Show => tracker.profile(subject)?,
        ProfileAction::Set {
            initial_period_date,
            cycle_duration,
            regular,
        } => tracker.update_profile(
            subject,
            &ProfileUpdate {
                initial_period_date,
                menstrual_cycle_duration: cycle_duration,
                is_menstrual_cycle_regular: regular,
            },
        )?,
    };
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}
