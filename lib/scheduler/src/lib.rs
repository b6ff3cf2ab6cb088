//! Scheduling core for telepost.
//!
//! This crate provides:
//!
//! - **Instance lock**: pid-file mutual exclusion across restarts
//! - **Publish cycle**: fetch, duplicate guard, dispatch, status write-back
//! - **Schedule loop**: the single-flight interval timer with graceful stop

pub mod cycle;
pub mod error;
pub mod lock;
pub mod runner;

pub use cycle::{CYCLE_MARKER, CycleReport, PublishCycle};
pub use error::LockError;
pub use lock::{InstanceLock, ProcessProbe, SystemProbe};
pub use runner::{LoopState, ScheduleLoop, TickOutcome};
