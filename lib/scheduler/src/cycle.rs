//! One fetch-dispatch-reconcile pass over the task store.
//!
//! Per-post failures are isolated: a post that fails validation or
//! delivery transitions to the error status and the cycle moves on. A
//! failed status write-back is logged only; the store stays the source of
//! truth and is re-read next cycle.

use std::sync::Arc;
use telepost_core::{MessagePublisher, Post, PostStatus, TaskStore};
use tracing::{debug, info, warn};

/// Log marker emitted at the start of every cycle.
///
/// The control surface scans the daemon log for this line to report the
/// last cycle time; keep it stable.
pub const CYCLE_MARKER: &str = "checking for scheduled posts";

/// Outcome counts of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Posts delivered and marked published.
    pub published: usize,
    /// Posts that failed validation or delivery.
    pub failed: usize,
    /// Posts skipped by the duplicate-publish guard.
    pub skipped: usize,
}

/// The fetch-dispatch-reconcile pipeline over the port seams.
pub struct PublishCycle {
    store: Arc<dyn TaskStore>,
    publisher: Arc<dyn MessagePublisher>,
}

impl PublishCycle {
    /// Wires the cycle to its collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { store, publisher }
    }

    /// Runs one complete cycle and reports the outcome counts.
    pub async fn run(&self) -> CycleReport {
        info!("{CYCLE_MARKER}");

        let posts = self.store.fetch_due().await;
        if posts.is_empty() {
            info!("no scheduled posts to publish");
            return CycleReport::default();
        }
        info!(count = posts.len(), "posts due for publication");

        let mut report = CycleReport::default();
        for post in &posts {
            match self.process(post).await {
                PostOutcome::Published => report.published += 1,
                PostOutcome::Failed => report.failed += 1,
                PostOutcome::Skipped => report.skipped += 1,
            }
        }

        info!(
            published = report.published,
            failed = report.failed,
            skipped = report.skipped,
            "cycle finished"
        );
        report
    }

    /// Reconciles a single post: duplicate guard, dispatch, write-back.
    async fn process(&self, post: &Post) -> PostOutcome {
        debug!(id = %post.id, title = %post.title, "processing post");

        // Guard against lagging reads and concurrent writers: a post the
        // store already shows as published is never dispatched again.
        if post.is_published() {
            debug!(id = %post.id, "already published, skipping");
            return PostOutcome::Skipped;
        }

        match self.publisher.publish(post).await {
            Ok(message_id) => {
                if let Err(err) = self
                    .store
                    .update_status(&post.id, PostStatus::Published, Some(message_id))
                    .await
                {
                    // The publish happened; the store will be re-read next
                    // cycle and the duplicate guard covers the gap.
                    warn!(id = %post.id, error = %err, "published but status write-back failed");
                }
                PostOutcome::Published
            }
            Err(err) => {
                warn!(id = %post.id, error = %err, "publish failed");
                if let Err(err) = self
                    .store
                    .update_status(&post.id, PostStatus::Error, None)
                    .await
                {
                    warn!(id = %post.id, error = %err, "error status write-back failed");
                }
                PostOutcome::Failed
            }
        }
    }
}

/// Reconciliation outcome for one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostOutcome {
    Published,
    Failed,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Local};
    use std::sync::Mutex;
    use telepost_core::{MessageId, PageId, PostType, PublishError, StoreError};

    fn post(id: &str) -> Post {
        Post {
            id: PageId::new(id),
            title: "t".to_string(),
            body: "hello".to_string(),
            post_type: PostType::Text,
            image_url: None,
            poll_question: None,
            poll_options: None,
            channel: None,
            publish_at: Local::now() - Duration::minutes(5),
            status: telepost_core::PostStatus::Scheduled,
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        due: Mutex<Vec<Post>>,
        updates: Mutex<Vec<(PageId, PostStatus, Option<MessageId>)>>,
        fail_updates: bool,
    }

    impl RecordingStore {
        fn with_due(posts: Vec<Post>) -> Arc<Self> {
            Arc::new(Self {
                due: Mutex::new(posts),
                ..Default::default()
            })
        }

        fn updates(&self) -> Vec<(PageId, PostStatus, Option<MessageId>)> {
            self.updates.lock().expect("updates lock").clone()
        }
    }

    #[async_trait]
    impl TaskStore for RecordingStore {
        async fn fetch_due(&self) -> Vec<Post> {
            self.due.lock().expect("due lock").clone()
        }

        async fn update_status(
            &self,
            id: &PageId,
            status: PostStatus,
            message_id: Option<MessageId>,
        ) -> Result<(), StoreError> {
            self.updates
                .lock()
                .expect("updates lock")
                .push((id.clone(), status, message_id));
            if self.fail_updates {
                return Err(StoreError::Transport {
                    reason: "store offline".to_string(),
                });
            }
            Ok(())
        }
    }

    struct ScriptedPublisher {
        calls: Mutex<u32>,
        results: Mutex<Vec<Result<MessageId, PublishError>>>,
    }

    impl ScriptedPublisher {
        fn replying(results: Vec<Result<MessageId, PublishError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(0),
                results: Mutex::new(results),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("calls lock")
        }
    }

    #[async_trait]
    impl MessagePublisher for ScriptedPublisher {
        async fn publish(&self, _post: &Post) -> Result<MessageId, PublishError> {
            *self.calls.lock().expect("calls lock") += 1;
            self.results.lock().expect("results lock").remove(0)
        }
    }

    #[tokio::test]
    async fn successful_post_is_published_and_written_back_once() {
        let store = RecordingStore::with_due(vec![post("p1")]);
        let publisher = ScriptedPublisher::replying(vec![Ok(MessageId::new(123))]);
        let cycle = PublishCycle::new(store.clone(), publisher.clone());

        let report = cycle.run().await;

        assert_eq!(report.published, 1);
        assert_eq!(publisher.calls(), 1);
        assert_eq!(
            store.updates(),
            vec![(
                PageId::new("p1"),
                PostStatus::Published,
                Some(MessageId::new(123))
            )]
        );
    }

    #[tokio::test]
    async fn duplicate_guard_produces_zero_dispatch_calls() {
        let mut published = post("p1");
        published.status = PostStatus::Published;

        let store = RecordingStore::with_due(vec![published]);
        let publisher = ScriptedPublisher::replying(vec![]);
        let cycle = PublishCycle::new(store.clone(), publisher.clone());

        let report = cycle.run().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(publisher.calls(), 0);
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn failed_publish_transitions_to_error_status() {
        let store = RecordingStore::with_due(vec![post("p1")]);
        let publisher = ScriptedPublisher::replying(vec![Err(PublishError::validation(
            "text post has no body",
        ))]);
        let cycle = PublishCycle::new(store.clone(), publisher.clone());

        let report = cycle.run().await;

        assert_eq!(report.failed, 1);
        assert_eq!(
            store.updates(),
            vec![(PageId::new("p1"), PostStatus::Error, None)]
        );
    }

    #[tokio::test]
    async fn one_failing_post_does_not_abort_the_rest() {
        let store = RecordingStore::with_due(vec![post("p1"), post("p2")]);
        let publisher = ScriptedPublisher::replying(vec![
            Err(PublishError::transport("connection reset")),
            Ok(MessageId::new(7)),
        ]);
        let cycle = PublishCycle::new(store.clone(), publisher.clone());

        let report = cycle.run().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.published, 1);
        assert_eq!(publisher.calls(), 2);
    }

    #[tokio::test]
    async fn write_back_failure_never_republishes() {
        let store = Arc::new(RecordingStore {
            due: Mutex::new(vec![post("p1")]),
            updates: Mutex::new(Vec::new()),
            fail_updates: true,
        });
        let publisher = ScriptedPublisher::replying(vec![Ok(MessageId::new(123))]);
        let cycle = PublishCycle::new(store.clone(), publisher.clone());

        let report = cycle.run().await;

        // The delivery happened exactly once; the failed write-back is an
        // operational log entry, not a retry trigger.
        assert_eq!(publisher.calls(), 1);
        assert_eq!(report.published, 1);
        assert_eq!(store.updates().len(), 1);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_report() {
        let store = RecordingStore::with_due(Vec::new());
        let publisher = ScriptedPublisher::replying(vec![]);
        let cycle = PublishCycle::new(store, publisher.clone());

        let report = cycle.run().await;

        assert_eq!(report, CycleReport::default());
        assert_eq!(publisher.calls(), 0);
    }
}
