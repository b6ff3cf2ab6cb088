//! Core domain types and utilities for the telepost scheduler.
//!
//! This crate provides the foundational types shared by every other crate:
//! the [`Post`] entity read from the task store, the port traits connecting
//! the scheduler to its collaborators, and the error taxonomy.

pub mod error;
pub mod ports;
pub mod post;

pub use error::{PublishError, Result, StoreError};
pub use ports::{MessagePublisher, TaskStore};
pub use post::{MessageId, PageId, Post, PostStatus, PostType};
