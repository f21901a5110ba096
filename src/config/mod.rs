//! Application configuration management

use std::env;

use anyhow::{Context, Result};

use crate::jobs::WorkerPool;
use crate::services::decider::DEFAULT_MATCH_THRESHOLD;
use crate::services::naming::DEFAULT_MOVIE_TEMPLATE;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite)
    pub database_url: String,

    /// Directory scanned for downloaded media files
    pub media_scan_path: String,

    /// Movie library root the organized links land in
    pub movies_target_path: String,

    /// Naming template for organized movie files
    pub movie_name_template: String,

    /// Matcher key: `tmdb`, `imdb`, `fallback`, `parallel` or
    /// `low_threshold_fallback`
    pub matcher: String,

    /// Target key: `hardlink`, or `noop` for a dry run
    pub media_target: String,

    /// Target resolver key; only `skip_existing` exists today
    pub media_resolver: String,

    /// Minimum candidate score (0-100) to accept a match automatically
    pub match_threshold: i32,

    /// Concurrent background jobs
    pub worker_threads: usize,

    /// Treat every scanned file as video instead of sniffing signatures
    pub skip_filetype_checks: bool,

    /// TMDB API key
    pub tmdb_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/cineshelf.db".to_string()),

            media_scan_path: env::var("MEDIA_SCAN_PATH")
                .unwrap_or_else(|_| "./data/downloads".to_string()),

            movies_target_path: env::var("MOVIES_TARGET_PATH")
                .unwrap_or_else(|_| "./data/movies".to_string()),

            movie_name_template: env::var("MOVIE_NAME_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_MOVIE_TEMPLATE.to_string()),

            matcher: env::var("MATCHER").unwrap_or_else(|_| "fallback".to_string()),

            media_target: env::var("MEDIA_TARGET").unwrap_or_else(|_| "hardlink".to_string()),

            media_resolver: env::var("MEDIA_RESOLVER")
                .unwrap_or_else(|_| "skip_existing".to_string()),

            match_threshold: env::var("MATCH_THRESHOLD")
                .unwrap_or_else(|_| DEFAULT_MATCH_THRESHOLD.to_string())
                .parse()
                .context("Invalid MATCH_THRESHOLD")?,

            worker_threads: env::var("WORKER_THREADS")
                .unwrap_or_else(|_| WorkerPool::default_workers().to_string())
                .parse()
                .context("Invalid WORKER_THREADS")?,

            skip_filetype_checks: env::var("SKIP_FILETYPE_CHECKS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            tmdb_api_key: env::var("TMDB_API_KEY").ok(),
        })
    }
}
