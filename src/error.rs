//! Core error taxonomy
//!
//! Every error a conversation turn can produce lands here. The dispatch
//! layer catches all of these at the turn boundary and converts them into a
//! recoverable session reset, so no single turn failure can take down a
//! session or leak into another one.

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced question id is absent. Reported to the caller, non-fatal.
    #[error("question not found: {0}")]
    NotFound(String),

    /// Authorization failure. Surfaced as a user-facing denial, never a
    /// silent no-op.
    #[error("permission denied")]
    Forbidden,

    /// The question was already answered or rejected by another admin
    /// between list render and submission.
    #[error("question {0} was already handled")]
    AlreadyHandled(String),

    /// Durable write or read failure. Fatal to the triggering operation;
    /// the store guarantees prior durable state is intact.
    #[error("storage failure: {0}")]
    Store(StoreError),

    /// Empty or otherwise invalid free-text input. Recoverable, re-prompt.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The channel publish that precedes an answer's store write failed.
    /// The store has not been touched at this point.
    #[error("channel publish failed: {0}")]
    Publish(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::NotFound(id),
            other => CoreError::Store(other),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
