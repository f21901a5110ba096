//! Local source adapter: candidates already persisted during a scan.
//!
//! When an item ended up unmatched, its retained candidates live in the
//! database. Manual matching against one of those goes through this source
//! so the job pipeline stays identical to the remote case.

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::db::Database;
use crate::services::movies::MovieMatchCandidate;
use crate::services::sources::{MediaSource, SearchResults};

pub struct LocalSource {
    db: Database,
}

impl LocalSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MediaSource for LocalSource {
    fn name(&self) -> &'static str {
        "local"
    }

    /// The local source never discovers anything new.
    async fn match_title(&self, _title: &str) -> Result<Vec<MovieMatchCandidate>> {
        Ok(Vec::new())
    }

    async fn search(&self, _title: &str) -> Result<SearchResults> {
        Ok(SearchResults::default())
    }

    async fn get_by_id(&self, id: &str) -> Result<MovieMatchCandidate> {
        let candidate_id: i64 = id
            .parse()
            .with_context(|| format!("invalid local candidate id '{id}'"))?;
        self.db
            .unmatched()
            .candidate(candidate_id)
            .await?
            .with_context(|| format!("no stored match candidate with id {candidate_id}"))
    }
}
