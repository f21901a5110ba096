//! Media library organizer: scans a downloads directory, identifies movie
//! files by their release names, matches them against metadata sources and
//! hard-links them into a cleanly named library.

pub mod config;
pub mod db;
pub mod events;
pub mod jobs;
pub mod services;

pub use config::Config;
pub use db::Database;
pub use events::{EventBus, EventKind, JobEvent};
