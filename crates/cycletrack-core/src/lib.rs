//! # Cycletrack Core Library
//!
//! This library provides the core logic for tracking menstrual periods
//! reported as single dates. The CLI binary is a thin layer over the same
//! core library.
//!
//! ## Architecture
//!
//! - **Episode clustering**: groups reported dates into contiguous episodes
//!   using an inclusive gap threshold
//! - **Forecasting**: estimates cycle length from up to four recent episodes
//!   and projects the next periods and ovulation dates
//! - **Storage**: SQLite-backed repository and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`EpisodeClusterer`]: merge-vs-create decision for a reported date
//! - [`CycleForecaster`]: cycle length estimation and projection
//! - [`Tracker`]: service composing both over a [`Store`]
//! - [`Database`]: SQLite implementation of [`Store`]
//! - [`Config`]: Application configuration management

pub mod episode;
pub mod error;
pub mod forecast;
pub mod profile;
pub mod storage;
pub mod store;
pub mod tracker;

pub use episode::{
    Assignment, DateEntry, Episode, EpisodeClusterer, EpisodeWithDates, MergeRule, Placement,
};
pub use error::{ConfigError, CoreError, DatabaseError, Result, TrackingError, ValidationError};
pub use forecast::{CycleForecaster, CycleStrategy, Forecast};
pub use profile::{Profile, ProfileUpdate};
pub use storage::{Config, Database};
pub use store::Store;
pub use tracker::{EpisodeFilter, Tracker};
