//! Transport-neutral reply description.
//!
//! A turn produces exactly one `Render`: the text to show plus zero or
//! more rows of tappable options. The transport adapter decides what an
//! option physically becomes (inline button, reply keyboard row, link).

use super::event::Action;

/// One tappable option on a rendered reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOption {
    /// Inline button carrying an encoded action.
    Action { label: String, action: Action },
    /// External URL button.
    Link { label: String, url: String },
    /// Persistent menu entry; tapping it sends its label back as text.
    Menu { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Render {
    pub text: String,
    pub rows: Vec<Vec<RenderOption>>,
}

impl Render {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, row: Vec<RenderOption>) -> Self {
        self.rows.push(row);
        self
    }

    /// Convenience for the common single-option row.
    pub fn action_row(self, label: impl Into<String>, action: Action) -> Self {
        self.row(vec![RenderOption::action(label, action)])
    }

    pub fn menu_rows(mut self, labels: &[&[&str]]) -> Self {
        for row in labels {
            self.rows.push(
                row.iter()
                    .map(|label| RenderOption::Menu {
                        label: (*label).to_string(),
                    })
                    .collect(),
            );
        }
        self
    }
}

impl RenderOption {
    pub fn action(label: impl Into<String>, action: Action) -> Self {
        RenderOption::Action {
            label: label.into(),
            action,
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        RenderOption::Link {
            label: label.into(),
            url: url.into(),
        }
    }
}
