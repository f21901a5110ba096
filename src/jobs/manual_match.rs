//! Manual matching: the user picked a candidate for a file the scan could
//! not settle, and the pipeline applies it like a regular match.

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

pub struct ManualMatchJob {
    job: Job,
    db: Database,
    resolver: TargetResolver,
    events: EventBus,
    sources: HashMap<String, Arc<dyn MediaSource>>,
}

impl ManualMatchJob {
    pub fn new(
        db: Database,
        resolver: TargetResolver,
        events: EventBus,
        sources: HashMap<String, Arc<dyn MediaSource>>,
    ) -> Self {
        Self {
            job: Job::new(JobType::ManualMatch),
            db,
            resolver,
            events,
            sources,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Apply the requested match. Any failure is reported on the event bus
    /// before it propagates.
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

        let mut media = request.media_item.transient_copy();
        media.job_id = Some(self.job.id.to_string());
        let target = self.resolver.resolve(&mut media, &movie);
        if !target.can_link() {
            bail!(
                "target {} already exists for {}",
                target.target().display(),
                media.filename
            );
        }

        let ids = operations::apply_manual_match(&self.db, &media, &movie, &target).await?;
        info!(
            filename = %media.filename,
            movie = %movie.title,
            source = %request.match_type,
            "applied manual match"
        );
        Ok(ids)
    }
}
