//! Store record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// External handle to a published channel post, used for in-place edits.
pub type MessageRef = i64;

/// Fixed question categories. Not user-extensible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    General,
    Spiritual,
    Personal,
    Urgent,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::General,
        Category::Spiritual,
        Category::Personal,
        Category::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Spiritual => "spiritual",
            Category::Personal => "personal",
            Category::Urgent => "urgent",
        }
    }

    /// Display label shown on menus and in posts.
    pub fn label(self) -> &'static str {
        match self {
            Category::General => "🌟 General",
            Category::Spiritual => "🙏 Spiritual",
            Category::Personal => "👤 Personal",
            Category::Urgent => "⚡️ Urgent",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Category::General),
            "spiritual" => Ok(Category::Spiritual),
            "personal" => Ok(Category::Personal),
            "urgent" => Ok(Category::Urgent),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question lifecycle status. Governs which admin actions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Answered,
    Rejected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Answered => "answered",
            Status::Rejected => "rejected",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Status::Pending => "⏳",
            Status::Answered => "✅",
            Status::Rejected => "❌",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "answered" => Ok(Status::Answered),
            "rejected" => Ok(Status::Rejected),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted anonymous question.
///
/// `user_id` identifies the asker for per-user queries and answer
/// notification only. It is never included in admin views or channel posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub category: Category,
    pub text: String,
    pub status: Status,
    #[serde(default)]
    pub important: bool,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_message_id: Option<MessageRef>,
}

/// Merge-patch applied by `QuestionStore::update`. Fields left `None` are
/// untouched. Category and text are deliberately absent: both are immutable
/// after creation.
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub status: Option<Status>,
    pub answer: Option<String>,
    pub answer_time: Option<DateTime<Utc>>,
    pub important: Option<bool>,
    pub published_message_id: Option<MessageRef>,
}

impl QuestionPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn important(important: bool) -> Self {
        Self {
            important: Some(important),
            ..Self::default()
        }
    }
}

/// Aggregate counters, maintained incrementally for O(1) reads.
///
/// Must always equal [`Stats::recount`] over the full question set; the
/// store's update rules preserve this and tests verify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(rename = "total_questions")]
    pub total: u64,
    #[serde(rename = "answered_questions")]
    pub answered: u64,
    pub categories: BTreeMap<Category, u64>,
}

impl Stats {
    /// Zeroed stats with every fixed category present.
    pub fn zeroed() -> Self {
        Self {
            total: 0,
            answered: 0,
            categories: Category::ALL.iter().map(|c| (*c, 0)).collect(),
        }
    }

    /// Full fold over the question set. The `answered` counter counts
    /// questions that have ever been answered, which is exactly the set
    /// still carrying an `answer` (answers survive reject/restore).
    pub fn recount<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Self {
        let mut stats = Stats::zeroed();
        for q in questions {
            stats.total += 1;
            if q.answer.is_some() {
                stats.answered += 1;
            }
            *stats.categories.entry(q.category).or_insert(0) += 1;
        }
        stats
    }

    pub fn category(&self, category: Category) -> u64 {
        self.categories.get(&category).copied().unwrap_or(0)
    }
}

impl Default for Stats {
    fn default() -> Self {
        Stats::zeroed()
    }
}

/// Point-in-time copy of the whole store, exchanged with backends.
/// Questions are in creation order.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub questions: Vec<Question>,
    pub stats: Stats,
}
