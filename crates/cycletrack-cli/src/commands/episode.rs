use clap::Subcommand;
use cycletrack_core::EpisodeFilter;

use super::open_tracker;

#[derive(Subcommand)]
pub enum EpisodeAction {
    /// List episodes, newest first
    List {
        /// Only episodes starting in this year
        #[arg(long)]
        year: Option<i32>,
        /// Only episodes starting in this month (1-12, requires --year)
        #[arg(long, requires = "year")]
        month: Option<u32>,
    },
    /// Show the most recent episode
    Last,
}

pub fn run(subject: i64, action: EpisodeAction) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker()?;

    match action {
        EpisodeAction::List { year, month } => {
            let episodes = tracker.episodes(subject, EpisodeFilter { year, month })?;
            println!("{}", serde_json::to_string_pretty(&episodes)?);
        }
        EpisodeAction::Last => {
            let episode = tracker.last_episode(subject)?;
            println!("{}", serde_json::to_string_pretty(&episode)?);
        }
    }
    Ok(())
}
