//! User-facing copy and message formatting.
//!
//! Every string a user or admin can see lives here, so the engine logic
//! stays free of literals and the copy can be reviewed in one place.

use crate::error::CoreError;
use crate::rules::DetailedStats;
use crate::store::{Question, Stats, Status};

/// Main menu labels. The dispatch layer matches incoming free text against
/// these exactly, so they double as a tiny wire format.
pub mod menu {
    pub const ASK_QUESTION: &str = "📝 Ask a question";
    pub const MY_QUESTIONS: &str = "❓ My questions";
    pub const MY_ANSWERS: &str = "📬 My answers";
    pub const HELP: &str = "ℹ️ Help";
    pub const CHANNEL: &str = "📢 Channel";
}

/// Admin menu labels.
pub mod admin_menu {
    pub const NEW_QUESTIONS: &str = "📥 New questions";
    pub const IMPORTANT: &str = "⭐ Important";
    pub const ANSWERED: &str = "✅ Answered";
    pub const REJECTED: &str = "❌ Rejected";
    pub const STATS: &str = "📊 Statistics";
    pub const MAIN_MENU: &str = "⬅️ Main menu";
}

pub const WELCOME: &str = "👋 Welcome! Ask your question anonymously and it \
will be answered in the channel. Use the menu below to get started.";

pub const HELP: &str = "How this works:\n\
• 📝 Ask a question — pick a category and type your question. It is \
submitted anonymously.\n\
• ❓ My questions — everything you have asked and its current status.\n\
• 📬 My answers — your questions that already have an answer.\n\
• /cancel — abandon whatever you were in the middle of.\n\n\
Answers are published anonymously in the channel.";

pub const CHOOSE_CATEGORY: &str = "Choose a category for your question:";
pub const TYPE_QUESTION: &str = "Now type your question:";
pub const EMPTY_TEXT: &str = "The message is empty. Please type your question as text.";
pub const CANCELLED: &str = "Cancelled. Back to the main menu.";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const QUESTION_ACCEPTED: &str =
    "✅ Your question has been submitted! You will be notified when it is answered.";
pub const NO_QUESTIONS_YET: &str = "You have not asked any questions yet.";
pub const NO_ANSWERS_YET: &str = "None of your questions have been answered yet.";
pub const ADMIN_MENU_TITLE: &str = "🛠 Admin panel";
pub const LIST_EMPTY: &str = "Nothing here.";
pub const TYPE_ANSWER: &str = "Type your answer:";
pub const TYPE_NEW_ANSWER: &str = "Type the replacement answer:";

/// Clip to a preview length without splitting a multi-byte character.
pub fn short_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max_chars).collect();
    format!("{clipped}...")
}

/// One-line list entry: status emoji, id and a clipped preview.
pub fn list_entry(q: &Question) -> String {
    let mark = if q.important { "⭐" } else { "" };
    format!("{} {}{} {}", q.status.emoji(), q.id, mark, short_text(&q.text, 30))
}

/// A user's own view of their question.
pub fn question_for_user(q: &Question) -> String {
    let mut out = format!(
        "{} {} · {}\n\n{}",
        q.status.emoji(),
        q.id,
        q.category.label(),
        q.text
    );
    if let Some(answer) = &q.answer {
        out.push_str("\n\n💬 Answer:\n");
        out.push_str(answer);
    }
    out
}

/// Full admin detail view. Deliberately omits the asker's identity.
pub fn question_for_admin(q: &Question) -> String {
    let mut out = format!(
        "{} {} · {}\nStatus: {}{}\nAsked: {}\n\n{}",
        q.status.emoji(),
        q.id,
        q.category.label(),
        q.status,
        if q.important { " ⭐" } else { "" },
        q.created_at.format("%Y-%m-%d %H:%M UTC"),
        q.text
    );
    if let Some(answer) = &q.answer {
        out.push_str("\n\n💬 Answer:\n");
        out.push_str(answer);
    }
    out
}

/// New-submission alert for the admin group.
pub fn admin_alert(q: &Question) -> String {
    format!(
        "📥 New question {} · {}\n\n{}",
        q.id,
        q.category.label(),
        short_text(&q.text, 200)
    )
}

/// Channel post body. `updated` marks a republication after a failed
/// in-place edit.
pub fn channel_post(q: &Question, answer: &str, updated: bool) -> String {
    let marker = if updated { "\n\n🔄 (updated answer)" } else { "" };
    format!(
        "{}\n\n❓ {}\n\n💬 {}{}",
        q.category.label(),
        q.text,
        answer,
        marker
    )
}

pub fn answer_notification(q: &Question) -> String {
    format!(
        "✅ Your question {} has been answered! See the channel post.",
        q.id
    )
}

/// Public stats summary shown to any user.
pub fn stats_summary(stats: &Stats) -> String {
    let mut out = format!(
        "📊 Statistics\n\nTotal questions: {}\nAnswered: {}\n",
        stats.total, stats.answered
    );
    for (cat, count) in &stats.categories {
        out.push_str(&format!("{}: {count}\n", cat.label()));
    }
    out
}

/// Expanded breakdown for the admin stats view.
pub fn detailed_stats(stats: &DetailedStats) -> String {
    let mut out = format!(
        "📊 Detailed statistics\n\nTotal: {}\n{} Pending: {}\n{} Answered: {}\n{} Rejected: {}\n⭐ Important: {}\n\nBy category:\n",
        stats.total,
        Status::Pending.emoji(),
        stats.pending,
        Status::Answered.emoji(),
        stats.answered,
        Status::Rejected.emoji(),
        stats.rejected,
        stats.important,
    );
    for (cat, count) in &stats.by_category {
        out.push_str(&format!("{}: {count}\n", cat.label()));
    }
    out.push_str(&format!("\nAnswer rate: {}%", stats.efficiency_pct));
    out
}

/// Turn a core error into something safe to show. Storage details stay in
/// the logs.
pub fn error_text(err: &CoreError) -> String {
    match err {
        CoreError::NotFound(id) => format!("Question {id} was not found."),
        CoreError::Forbidden => "This action is for admins only.".to_string(),
        CoreError::AlreadyHandled(id) => {
            format!("Question {id} was already handled by another admin.")
        }
        CoreError::Store(_) => "Something went wrong saving your request. Please try again.".to_string(),
        CoreError::Validation(msg) => msg.clone(),
        CoreError::Publish(_) => {
            "Publishing to the channel failed. Nothing was saved, please try again.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Category;
    use chrono::Utc;

    fn question(text: &str) -> Question {
        Question {
            id: "q1".to_string(),
            category: Category::General,
            text: text.to_string(),
            status: Status::Pending,
            important: false,
            user_id: 42,
            created_at: Utc::now(),
            answer: None,
            answer_time: None,
            published_message_id: None,
        }
    }

    #[test]
    fn short_text_is_char_safe() {
        assert_eq!(short_text("short", 30), "short");
        let long = "д".repeat(40);
        let clipped = short_text(&long, 30);
        assert!(clipped.ends_with("..."));
        assert_eq!(clipped.chars().count(), 33);
    }

    #[test]
    fn admin_views_never_leak_the_asker() {
        let q = question("What is the meaning of life?");
        assert!(!question_for_admin(&q).contains("42"));
        assert!(!admin_alert(&q).contains("42"));
        assert!(!channel_post(&q, "an answer", false).contains("42"));
    }

    #[test]
    fn channel_post_marks_republications() {
        let q = question("Why?");
        assert!(!channel_post(&q, "Because.", false).contains("updated answer"));
        assert!(channel_post(&q, "Because.", true).contains("🔄 (updated answer)"));
    }
}
