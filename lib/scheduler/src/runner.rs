//! The interval-driven schedule loop.
//!
//! Per cycle the loop moves `Idle → Running → Idle`; `Stopped` is
//! terminal. Cycles never overlap: a tick that finds the loop `Running`
//! is dropped, making the scheduler single-flight per process. A stop
//! request never cancels an in-flight cycle; it takes effect at the next
//! idle boundary.

use crate::cycle::{CycleReport, PublishCycle};
use chrono::{DateTime, Local};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Loop lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next tick.
    Idle,
    /// A cycle is in flight.
    Running,
    /// Terminal; future ticks are suppressed.
    Stopped,
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Result of offering a tick to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A full cycle ran.
    Completed(CycleReport),
    /// A cycle was already in flight; the tick was dropped.
    Skipped,
    /// The loop is stopped.
    Stopped,
}

/// Recurring single-flight driver around a [`PublishCycle`].
pub struct ScheduleLoop {
    cycle: PublishCycle,
    interval: Duration,
    state: AtomicU8,
    last_cycle_at: Mutex<Option<DateTime<Local>>>,
}

impl ScheduleLoop {
    /// Creates a loop firing every `interval`.
    #[must_use]
    pub fn new(cycle: PublishCycle, interval: Duration) -> Self {
        Self {
            cycle,
            interval,
            state: AtomicU8::new(IDLE),
            last_cycle_at: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        match self.state.load(Ordering::SeqCst) {
            RUNNING => LoopState::Running,
            STOPPED => LoopState::Stopped,
            _ => LoopState::Idle,
        }
    }

    /// When the last cycle completed, if one has.
    #[must_use]
    pub fn last_cycle_at(&self) -> Option<DateTime<Local>> {
        *self
            .last_cycle_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Moves the loop to `Stopped`. An in-flight cycle finishes normally.
    pub fn stop(&self) {
        self.state.store(STOPPED, Ordering::SeqCst);
    }

    /// Offers one tick: runs a cycle unless one is in flight or the loop
    /// is stopped.
    pub async fn tick(&self) -> TickOutcome {
        match self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {}
            Err(RUNNING) => {
                debug!("tick dropped, cycle already running");
                return TickOutcome::Skipped;
            }
            Err(_) => return TickOutcome::Stopped,
        }

        let report = self.cycle.run().await;
        *self
            .last_cycle_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Local::now());

        // Return to Idle unless a stop arrived mid-cycle.
        let _ = self
            .state
            .compare_exchange(RUNNING, IDLE, Ordering::SeqCst, Ordering::SeqCst);

        TickOutcome::Completed(report)
    }

    /// Drives the loop until a stop request arrives.
    ///
    /// The first cycle fires one full interval after start, matching the
    /// store-side expectation that freshly scheduled posts get an editing
    /// grace period.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "schedule loop started");

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match self.tick().await {
                        TickOutcome::Completed(_) | TickOutcome::Skipped => {}
                        TickOutcome::Stopped => break,
                    }
                }
                _ = shutdown.changed() => {
                    info!("stop requested");
                    self.stop();
                    break;
                }
            }
        }

        info!("schedule loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;
    use telepost_core::{
        MessageId, MessagePublisher, PageId, Post, PostStatus, PublishError, StoreError, TaskStore,
    };
    use tokio::sync::Notify;

    /// Store whose fetch blocks until released, to hold a cycle in flight.
    struct GatedStore {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        fetches: AtomicU32,
    }

    #[async_trait]
    impl TaskStore for GatedStore {
        async fn fetch_due(&self) -> Vec<Post> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Vec::new()
        }

        async fn update_status(
            &self,
            _id: &PageId,
            _status: PostStatus,
            _message_id: Option<MessageId>,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct NoopPublisher;

    #[async_trait]
    impl MessagePublisher for NoopPublisher {
        async fn publish(&self, _post: &Post) -> Result<MessageId, PublishError> {
            Ok(MessageId::new(1))
        }
    }

    fn gated_loop() -> (Arc<ScheduleLoop>, Arc<Notify>, Arc<Notify>, Arc<GatedStore>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = Arc::new(GatedStore {
            entered: entered.clone(),
            release: release.clone(),
            fetches: AtomicU32::new(0),
        });
        let cycle = PublishCycle::new(store.clone(), Arc::new(NoopPublisher));
        let schedule = Arc::new(ScheduleLoop::new(cycle, Duration::from_secs(900)));
        (schedule, entered, release, store)
    }

    #[tokio::test]
    async fn two_ticks_while_running_execute_one_cycle() {
        let (schedule, entered, release, store) = gated_loop();

        let in_flight = tokio::spawn({
            let schedule = schedule.clone();
            async move { schedule.tick().await }
        });
        entered.notified().await;
        assert_eq!(schedule.state(), LoopState::Running);

        assert_eq!(schedule.tick().await, TickOutcome::Skipped);
        assert_eq!(schedule.tick().await, TickOutcome::Skipped);

        release.notify_one();
        let outcome = in_flight.await.expect("tick task");
        assert_eq!(outcome, TickOutcome::Completed(CycleReport::default()));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(schedule.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn stopped_loop_suppresses_ticks() {
        let (schedule, _entered, _release, store) = gated_loop();

        schedule.stop();
        assert_eq!(schedule.state(), LoopState::Stopped);
        assert_eq!(schedule.tick().await, TickOutcome::Stopped);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_during_a_cycle_wins_over_returning_to_idle() {
        let (schedule, entered, release, _store) = gated_loop();

        let in_flight = tokio::spawn({
            let schedule = schedule.clone();
            async move { schedule.tick().await }
        });
        entered.notified().await;
        schedule.stop();
        release.notify_one();

        // The in-flight cycle completes; the loop stays stopped.
        assert!(matches!(
            in_flight.await.expect("tick task"),
            TickOutcome::Completed(_)
        ));
        assert_eq!(schedule.state(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn completed_cycle_records_its_time() {
        let (schedule, entered, release, _store) = gated_loop();
        assert!(schedule.last_cycle_at().is_none());

        let in_flight = tokio::spawn({
            let schedule = schedule.clone();
            async move { schedule.tick().await }
        });
        entered.notified().await;
        release.notify_one();
        in_flight.await.expect("tick task");

        assert!(schedule.last_cycle_at().is_some());
    }

    #[tokio::test]
    async fn run_honors_shutdown_before_first_tick() {
        let (schedule, _entered, _release, store) = gated_loop();
        let (tx, rx) = watch::channel(false);

        let driver = tokio::spawn({
            let schedule = schedule.clone();
            async move { schedule.run(rx).await }
        });
        tx.send(true).expect("send shutdown");
        driver.await.expect("driver task");

        assert_eq!(schedule.state(), LoopState::Stopped);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
    }
}
