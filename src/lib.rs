//! Anonymous Q&A intake core.
//!
//! A transport-agnostic engine for an anonymous question channel: users
//! submit categorized questions, admins answer, reject or restore them,
//! and accepted answers are published to a public channel. The crate owns
//! the question lifecycle, per-user conversation sessions, admin rules and
//! the durable store; delivering messages over an actual chat network is
//! left to adapters implementing the traits in [`engine::traits`].

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod rules;
pub mod session;
pub mod store;
pub mod text;
