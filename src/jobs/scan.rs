//! The scan job: walk the downloads directory, match every movie file and
//! link it into the library.
//!
//! Items are processed one at a time; a failure on one item is logged and
//! the scan moves on. The job narrates itself on the event bus with one
//! progress event per file and a single terminal completed event.

use anyhow::Result;
use tracing::{debug, warn};

use crate::db::{Database, operations};
use crate::events::{EventBus, JobEvent};
use crate::services::decider::{MatchDecider, MatchOutcome};
use crate::services::matcher::Matcher;
use crate::services::media::ParsedMediaItem;
use crate::services::scanner::MediaScanner;
use crate::services::targets::TargetResolver;

use super::{Job, JobType};

pub struct ScanJob {
    job: Job,
    scanner: MediaScanner,
    matcher: Matcher,
    decider: MatchDecider,
    resolver: TargetResolver,
    db: Database,
    events: EventBus,
}

impl ScanJob {
    pub fn new(
        scanner: MediaScanner,
        matcher: Matcher,
        decider: MatchDecider,
        resolver: TargetResolver,
        db: Database,
        events: EventBus,
    ) -> Self {
        Self {
            job: Job::new(JobType::MediaScanner),
            scanner,
            matcher,
            decider,
            resolver,
            db,
            events,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Run the scan to completion. Item-level failures are contained: they
    /// are logged, the item is skipped, and the scan carries on.
    pub async fn run(&self) -> Result<()> {
        let total = self.scanner.count_items();
        debug!(
            job_id = %self.job.id,
            scan_path = %self.scanner.scan_path().display(),
            total,
            "starting media scan"
        );

        for (index, mut item) in self.scanner.items().enumerate() {
            item.job_id = Some(self.job.id.to_string());
            let filename = item.filename.clone();
            if let Err(error) = self.process_item(item).await {
                warn!(filename = %filename, error = %format!("{error:#}"), "failed to process item");
            }
            self.events.emit(JobEvent::progress(
                &self.job,
                Some(index + 1),
                Some(total),
                Some(filename),
            ));
        }

        self.events.emit(JobEvent::completed(&self.job));
        Ok(())
    }

    async fn process_item(&self, mut item: ParsedMediaItem) -> Result<()> {
        if !item.is_movie() {
            debug!(filename = %item.filename, "skipping series content");
            return Ok(());
        }
        if self
            .db
            .media_items()
            .find_matched(&item.filename, &item.path)
            .await?
            .is_some()
        {
            debug!(filename = %item.filename, "already matched, skipping");
            return Ok(());
        }

        let candidates = self.matcher.top5_matches(&item).await?;
        match self.decider.try_match(candidates) {
            MatchOutcome::Matched { movie, .. } => {
                let target = self.resolver.resolve(&mut item, &movie);
                if !target.can_link() {
                    return Ok(());
                }
                operations::match_movie(&self.db, &item, &movie, &target).await?;
            }
            MatchOutcome::Unmatched {
                potential_matches,
                reason,
            } => {
                operations::record_unmatched(&self.db, &item, &potential_matches, reason).await?;
            }
        }
        Ok(())
    }
}
