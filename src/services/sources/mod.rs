//! Metadata source adapters.
//!
//! Every source answers the same four questions behind [`MediaSource`]:
//! score candidates for a parsed title, run a lightweight free-text search,
//! fetch one candidate by its id there, and cross-reference an IMDB id.
//! The matcher composes sources without knowing which is which.

mod imdb;
mod local;
mod tmdb;

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::Database;
use crate::services::movies::MovieMatchCandidate;

pub use imdb::ImdbSource;
pub use local::LocalSource;
pub use tmdb::TmdbSource;

/// One row of a lightweight search, for browsing rather than matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub title: String,
    pub release_year: Option<i32>,
    pub plot: Option<String>,
    pub poster: Option<String>,
    pub source: String,
    pub source_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total_results: usize,
    pub results: Vec<SearchItem>,
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Stable tag for this source (`tmdb`, `imdb`, `local`).
    fn name(&self) -> &'static str;

    /// Unscored candidates for a parsed title. Errors propagate: a matching
    /// path must know the source was unreachable rather than treat it as
    /// "no results".
    async fn match_title(&self, title: &str) -> Result<Vec<MovieMatchCandidate>>;

    /// Free-text search for interactive use. Convenience path: sources may
    /// degrade to empty results here.
    async fn search(&self, title: &str) -> Result<SearchResults>;

    /// Fetch a single candidate by this source's own id.
    async fn get_by_id(&self, id: &str) -> Result<MovieMatchCandidate>;

    /// Cross-reference an IMDB id into this source, used for composite
    /// dedup. Sources without such a mapping return `None`.
    async fn get_by_imdb_id(&self, _imdb_id: &str) -> Result<Option<MovieMatchCandidate>> {
        Ok(None)
    }
}

/// Closed registry of source tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Tmdb,
    Imdb,
    Local,
}

impl SourceKind {
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "tmdb" => Ok(SourceKind::Tmdb),
            "imdb" => Ok(SourceKind::Imdb),
            "local" => Ok(SourceKind::Local),
            other => bail!("unknown media source '{other}'"),
        }
    }
}

/// Build a source by tag. The closed mapping keeps config keys honest: an
/// unknown tag is an error at startup, not a silent fallback.
pub fn create_source(kind: SourceKind, config: &Config, db: &Database) -> Arc<dyn MediaSource> {
    match kind {
        SourceKind::Tmdb => Arc::new(TmdbSource::new(config.tmdb_api_key.clone())),
        SourceKind::Imdb => Arc::new(ImdbSource::new()),
        SourceKind::Local => Arc::new(LocalSource::new(db.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_is_a_closed_set() {
        assert_eq!(SourceKind::from_key("tmdb").unwrap(), SourceKind::Tmdb);
        assert_eq!(SourceKind::from_key("imdb").unwrap(), SourceKind::Imdb);
        assert_eq!(SourceKind::from_key("local").unwrap(), SourceKind::Local);
        assert!(SourceKind::from_key("omdb").is_err());
    }
}
