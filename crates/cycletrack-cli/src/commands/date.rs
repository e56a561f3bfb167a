use chrono::{Local, NaiveDate};
use clap::Subcommand;

use super::{open_tracker, parse_date};

#[derive(Subcommand)]
pub enum DateAction {
    /// Record a period date (YYYY-MM-DD)
    Add {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Remove a recorded date by entry ID
    Remove {
        /// Date entry ID
        id: i64,
    },
}

pub fn run(subject: i64, action: DateAction) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker()?;

    match action {
        DateAction::Add { date } => {
            let today = Local::now().date_naive();
            let assignment = tracker.record_date(subject, date, today)?;
            println!("{}", serde_json::to_string_pretty(&assignment)?);
        }
        DateAction::Remove { id } => {
            tracker.remove_date(id, subject)?;
            println!("{}", serde_json::json!({ "code": "success" }));
        }
    }
    Ok(())
}
