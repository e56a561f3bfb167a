mod config;
pub mod database;
pub mod migrations;

pub use config::{ClusteringConfig, Config, ForecastConfig};
pub use database::Database;

use std::path::PathBuf;

/// Returns `~/.config/cycletrack[-dev]/` based on CYCLETRACK_ENV.
///
/// Set CYCLETRACK_ENV=dev to use development data directory.
/// CYCLETRACK_DATA_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("CYCLETRACK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("CYCLETRACK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("cycletrack-dev")
            } else {
                base_dir.join("cycletrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
