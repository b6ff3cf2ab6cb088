//! Port traits connecting the scheduler to its external collaborators.
//!
//! The scheduler core only sees these seams; the concrete Notion and
//! Telegram clients implement them, and tests substitute in-memory fakes.

use crate::error::{PublishError, StoreError};
use crate::post::{MessageId, PageId, Post, PostStatus};
use async_trait::async_trait;

/// Read/write access to the remote task store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetches every post currently due for publication, in retrieval order.
    ///
    /// Individual malformed records are skipped; a total request failure
    /// yields an empty sequence. This operation never fails the cycle.
    async fn fetch_due(&self) -> Vec<Post>;

    /// Writes the status field of a single record.
    ///
    /// `message_id` annotates a Published transition; the store update
    /// itself only touches the status field.
    ///
    /// # Errors
    ///
    /// Returns an error when the write could not be confirmed. Callers log
    /// the failure and move on; the store is re-read next cycle.
    async fn update_status(
        &self,
        id: &PageId,
        status: PostStatus,
        message_id: Option<MessageId>,
    ) -> Result<(), StoreError>;
}

/// Delivery of a post to the messaging provider.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Validates and publishes one post, returning the provider message id.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Validation`] for malformed content (no side
    /// effect was produced) or [`PublishError::Transport`] for provider and
    /// network failures.
    async fn publish(&self, post: &Post) -> Result<MessageId, PublishError>;
}
