//! Per-user conversation state.
//!
//! A session is owned by the dispatch layer and mutated by exactly one
//! conversation turn at a time. Everything here is plain data; the legal
//! transitions live in the engine.

use crate::store::Status;

/// Where a user currently is in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Browsing menus; free text is interpreted as menu selection.
    #[default]
    Idle,
    /// Category picker is showing; waiting for a category button.
    ChoosingCategory,
    /// Category chosen; the next non-empty text becomes the question.
    AwaitingQuestionText { category: crate::store::Category },
    /// Admin composing an answer for one question.
    Answering { question_id: String },
    /// Admin composing a replacement answer for one question.
    Editing { question_id: String },
}

/// Which question list an admin is paging through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    Status(Status),
    Important,
}

/// A paged admin list view. The ids are captured when the list is first
/// rendered so page flips are stable even while other admins mutate the
/// store underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Browse {
    pub filter: ListFilter,
    pub page: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: SessionState,
    pub browse: Option<Browse>,
}

impl Session {
    /// Drop any in-flight flow and return to the idle menu. Used by
    /// /cancel and by the dispatch layer after a failed turn.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.browse = None;
    }
}
