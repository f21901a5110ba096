//! Job lifecycle events and the broadcast bus.
//!
//! Jobs narrate themselves through three event kinds: `progress` per item,
//! and exactly one terminal `completed` or `error`. Events fan out over a
//! tokio broadcast channel; the bus never blocks on slow subscribers and
//! emitting without any subscriber is fine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::jobs::Job;

/// Channel namespace; each job type gets `/jobs/<job_type>`.
pub const JOB_CHANNEL_NAMESPACE: &str = "/jobs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Progress,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: String,
    pub job_type: String,
    pub event_type: EventKind,
    pub current_item: Option<usize>,
    pub total_items: Option<usize>,
    /// Free-form payload: filename for progress, error text for errors.
    pub context: Option<String>,
}

impl JobEvent {
    pub fn progress(
        job: &Job,
        current_item: Option<usize>,
        total_items: Option<usize>,
        context: Option<String>,
    ) -> Self {
        Self {
            job_id: job.id.to_string(),
            job_type: job.job_type.as_str().to_string(),
            event_type: EventKind::Progress,
            current_item,
            total_items,
            context,
        }
    }

    pub fn completed(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            job_type: job.job_type.as_str().to_string(),
            event_type: EventKind::Completed,
            current_item: None,
            total_items: None,
            context: None,
        }
    }

    pub fn error(job: &Job, context: impl Into<String>) -> Self {
        Self {
            job_id: job.id.to_string(),
            job_type: job.job_type.as_str().to_string(),
            event_type: EventKind::Error,
            current_item: None,
            total_items: None,
            context: Some(context.into()),
        }
    }

    /// Push-channel name this event belongs on.
    pub fn channel(&self) -> String {
        format!("{JOB_CHANNEL_NAMESPACE}/{}", self.job_type)
    }
}

/// Fan-out point between jobs and whatever transports events onward.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: JobEvent) {
        debug!(
            job_id = %event.job_id,
            channel = %event.channel(),
            kind = ?event.event_type,
            "emitting job event"
        );
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobType;
    use pretty_assertions::assert_eq;

    #[test]
    fn progress_event_serialization_shape() {
        let job = Job::new(JobType::MediaScanner);
        let event = JobEvent::progress(&job, Some(3), Some(10), Some("Aquaman.mkv".into()));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["job_id"], job.id.to_string());
        assert_eq!(value["job_type"], "media_scanner");
        assert_eq!(value["event_type"], "progress");
        assert_eq!(value["current_item"], 3);
        assert_eq!(value["total_items"], 10);
        assert_eq!(value["context"], "Aquaman.mkv");
    }

    #[test]
    fn channel_is_namespaced_by_job_type() {
        let scan = JobEvent::completed(&Job::new(JobType::MediaScanner));
        assert_eq!(scan.channel(), "/jobs/media_scanner");
        let manual = JobEvent::completed(&Job::new(JobType::ManualMatch));
        assert_eq!(manual.channel(), "/jobs/manual_match");
        let fix = JobEvent::completed(&Job::new(JobType::FixMatch));
        assert_eq!(fix.channel(), "/jobs/fix_match");
    }

    #[tokio::test]
    async fn bus_delivers_to_all_subscribers() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let job = Job::new(JobType::MediaScanner);
        bus.emit(JobEvent::completed(&job));
        assert_eq!(first.recv().await.unwrap().event_type, EventKind::Completed);
        assert_eq!(second.recv().await.unwrap().event_type, EventKind::Completed);
    }

    #[test]
    fn emitting_without_subscribers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.emit(JobEvent::completed(&Job::new(JobType::FixMatch)));
    }
}
