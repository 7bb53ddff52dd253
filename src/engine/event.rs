//! Inbound conversation events and the button wire format.
//!
//! Buttons round-trip through short callback strings (`cat_urgent`,
//! `view_q_q3`, `page_2`). The string layout is part of the persisted
//! surface: a button rendered before a restart must still parse after it.

use crate::store::Category;
use std::fmt;

/// One inbound event from the transport, already split by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    /// Free text. Interpretation depends on the session state.
    Text(String),
    /// A tapped inline button.
    Button(Action),
}

/// Slash commands. Anything else arrives as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    Admin,
    Stats,
}

impl Command {
    pub fn parse(s: &str) -> Option<Command> {
        match s {
            "/start" => Some(Command::Start),
            "/help" => Some(Command::Help),
            "/cancel" => Some(Command::Cancel),
            "/admin" => Some(Command::Admin),
            "/stats" => Some(Command::Stats),
            _ => None,
        }
    }
}

/// Everything a button tap can mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectCategory(Category),
    BackToMain,
    AdminMenu,
    Page(usize),
    View(String),
    Answer(String),
    Edit(String),
    Reject(String),
    Restore(String),
    ToggleImportant(String),
    Stats,
}

impl Action {
    /// Wire string carried inside the button.
    pub fn encode(&self) -> String {
        match self {
            Action::SelectCategory(cat) => format!("cat_{cat}"),
            Action::BackToMain => "back_to_main".to_string(),
            Action::AdminMenu => "admin_menu".to_string(),
            Action::Page(page) => format!("page_{page}"),
            Action::View(id) => format!("view_q_{id}"),
            Action::Answer(id) => format!("answer_{id}"),
            Action::Edit(id) => format!("edit_{id}"),
            Action::Reject(id) => format!("reject_{id}"),
            Action::Restore(id) => format!("restore_{id}"),
            Action::ToggleImportant(id) => format!("important_{id}"),
            Action::Stats => "stats".to_string(),
        }
    }

    pub fn parse(data: &str) -> Option<Action> {
        if let Some(cat) = data.strip_prefix("cat_") {
            return cat.parse().ok().map(Action::SelectCategory);
        }
        if let Some(page) = data.strip_prefix("page_") {
            return page.parse().ok().map(Action::Page);
        }
        if let Some(id) = data.strip_prefix("view_q_") {
            return Some(Action::View(id.to_string()));
        }
        if let Some(id) = data.strip_prefix("answer_") {
            return Some(Action::Answer(id.to_string()));
        }
        if let Some(id) = data.strip_prefix("edit_") {
            return Some(Action::Edit(id.to_string()));
        }
        if let Some(id) = data.strip_prefix("reject_") {
            return Some(Action::Reject(id.to_string()));
        }
        if let Some(id) = data.strip_prefix("restore_") {
            return Some(Action::Restore(id.to_string()));
        }
        if let Some(id) = data.strip_prefix("important_") {
            return Some(Action::ToggleImportant(id.to_string()));
        }
        match data {
            "back_to_main" => Some(Action::BackToMain),
            "admin_menu" => Some(Action::AdminMenu),
            "stats" => Some(Action::Stats),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
