//! Fix-match: move an already-organized item from the wrong movie to the
//! right one, replacing the old link and pruning the abandoned movie.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::db::{Database, operations};
use crate::events::{EventBus, JobEvent};
use crate::services::movies::MovieMatchRequest;
use crate::services::sources::MediaSource;
use crate::services::targets::TargetResolver;

use super::{Job, JobType};

pub struct FixMatchJob {
    job: Job,
    db: Database,
    resolver: TargetResolver,
    events: EventBus,
    sources: HashMap<String, Arc<dyn MediaSource>>,
}

impl FixMatchJob {
    pub fn new(
        db: Database,
        resolver: TargetResolver,
        events: EventBus,
        sources: HashMap<String, Arc<dyn MediaSource>>,
    ) -> Self {
        Self {
            job: Job::new(JobType::FixMatch),
            db,
            resolver,
            events,
            sources,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Re-match the item against the requested candidate. Failures are
    /// reported on the event bus before they propagate.
    pub async fn run(&self, request: MovieMatchRequest) -> Result<(i64, i64)> {
        match self.execute(&request).await {
            Ok(ids) => {
                self.events.emit(JobEvent::progress(
                    &self.job,
                    Some(1),
                    Some(1),
                    Some(request.media_item.filename.clone()),
                ));
                self.events.emit(JobEvent::completed(&self.job));
                Ok(ids)
            }
            Err(error) => {
                self.events
                    .emit(JobEvent::error(&self.job, format!("{error:#}")));
                Err(error)
            }
        }
    }

    async fn execute(&self, request: &MovieMatchRequest) -> Result<(i64, i64)> {
        let Some(source) = self.sources.get(&request.match_type) else {
            bail!("unknown match type '{}'", request.match_type);
        };
        let old_media = &request.media_item;
        if old_media.id.is_none() {
            bail!("fix match requires a persisted media item");
        }
        let candidate = source
            .get_by_id(&request.source_id)
            .await
            .with_context(|| {
                format!(
                    "failed to fetch candidate {} from {}",
                    request.source_id, request.match_type
                )
            })?;
        let movie = candidate.to_movie();

        let mut new_media = old_media.transient_copy();
        new_media.job_id = Some(self.job.id.to_string());
        let target = self.resolver.resolve(&mut new_media, &movie);
        if !target.can_link() {
            bail!(
                "target {} already exists for {}",
                target.target().display(),
                new_media.filename
            );
        }

        let ids =
            operations::apply_fix_match(&self.db, old_media, &new_media, &movie, &target).await?;
        info!(
            filename = %new_media.filename,
            movie = %movie.title,
            source = %request.match_type,
            "applied fix match"
        );
        Ok(ids)
    }
}
