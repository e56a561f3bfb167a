//! Core error types for cycletrack-core.
//!
//! This module defines the error hierarchy using thiserror. Tracking
//! failures are terminal for the current operation and propagate unchanged;
//! mapping them to a transport-level response is the caller's job.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for cycletrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Episode clustering and forecasting failures
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Domain failures raised by the tracker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    /// Not enough history (or seed date) to forecast
    #[error("There is not enough data to forecast the next menstrual periods")]
    NotEnoughData,

    /// The date is already recorded on the target episode
    #[error("Date {date} was already added to episode {episode_id}")]
    DateAlreadyExists { episode_id: i64, date: NaiveDate },

    /// No date entry with this id
    #[error("Date entry {id} does not exist")]
    DateNotFound { id: i64 },

    /// The date entry belongs to another subject's episode
    #[error("Date entry {id} does not belong to this subject")]
    NotOwned { id: i64 },

    /// The subject has no episodes yet
    #[error("No menstrual period found for this subject")]
    NoEpisodes,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Reported date lies after today
    #[error("Date {date} is in the future (today is {today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::Config(ConfigError::ParseFailed(err.to_string()))
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::Custom(err.to_string())
    }
}

impl CoreError {
    /// The tracking failure behind this error, if any.
    pub fn tracking(&self) -> Option<&TrackingError> {
        match self {
            CoreError::Tracking(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
