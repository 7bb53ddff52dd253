//! Outbound collaborator seams.
//!
//! The engine never talks to a chat network directly; it calls these
//! traits and the embedding process supplies real adapters. Tests plug in
//! recording fakes.

use crate::store::MessageRef;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PublishError(pub String);

#[derive(Debug, Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// Posts answered questions to the public channel.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Publish a new post, returning its handle for later in-place edits.
    async fn publish(&self, text: &str) -> Result<MessageRef, PublishError>;

    /// Edit a previously published post in place.
    async fn edit(&self, message: MessageRef, text: &str) -> Result<(), PublishError>;
}

/// Delivers out-of-band notifications. All notification failures are
/// non-fatal to the turn that triggered them.
#[async_trait]
pub trait UserNotifier: Send + Sync {
    /// Tell an asker their question was answered, optionally linking to
    /// the channel post.
    async fn notify_user(
        &self,
        user_id: i64,
        text: &str,
        link: Option<&str>,
    ) -> Result<(), NotifyError>;

    /// Alert the admin group about a new submission.
    async fn notify_admins(&self, text: &str) -> Result<(), NotifyError>;
}
