//! Session routing and turn-boundary error recovery.
//!
//! Owns the session table and guarantees two things the engine relies on:
//! each session is mutated by one turn at a time, and every turn produces a
//! reply. Errors from the engine are converted into user-facing text here
//! and the failed session is reset, so a bad turn never wedges a user.

use crate::engine::event::Inbound;
use crate::engine::render::Render;
use crate::engine::traits::{ChannelPublisher, UserNotifier};
use crate::engine::Engine;
use crate::error::CoreError;
use crate::session::Session;
use crate::text;
use std::collections::HashMap;
use std::sync::Mutex;

/// One inbound event addressed to a session.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Conversation key, usually the chat id. Distinct from the user id so
    /// group chats do not share private session state.
    pub session_id: i64,
    pub user_id: i64,
    pub input: Inbound,
}

pub struct Dispatch<P, N> {
    engine: Engine<P, N>,
    sessions: Mutex<HashMap<i64, Session>>,
}

impl<P: ChannelPublisher, N: UserNotifier> Dispatch<P, N> {
    pub fn new(engine: Engine<P, N>) -> Self {
        Self {
            engine,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Engine<P, N> {
        &self.engine
    }

    /// Handle one event and always return a reply.
    ///
    /// The session is cloned out of the table before the turn and written
    /// back after, so the table lock is never held across an await.
    pub async fn handle_event(&self, event: InboundEvent) -> Render {
        let mut session = {
            let sessions = self.sessions.lock().unwrap();
            sessions.get(&event.session_id).cloned().unwrap_or_default()
        };

        let render = match self
            .engine
            .handle(&mut session, event.user_id, event.input.clone())
            .await
        {
            Ok(render) => render,
            Err(err) => {
                self.log_turn_error(&event, &err);
                session.reset();
                Render::text(text::error_text(&err))
            }
        };

        self.sessions
            .lock()
            .unwrap()
            .insert(event.session_id, session);
        render
    }

    fn log_turn_error(&self, event: &InboundEvent, err: &CoreError) {
        match err {
            // Expected outcomes of normal concurrent use.
            CoreError::Forbidden | CoreError::AlreadyHandled(_) | CoreError::NotFound(_) => {
                tracing::info!(session = event.session_id, error = %err, "turn refused");
            }
            _ => {
                tracing::error!(session = event.session_id, error = %err, "turn failed");
            }
        }
    }
}
