//! Admin authorization and lifecycle transition guards.
//!
//! Pure functions over store records. The engine re-fetches a question and
//! runs the relevant guard immediately before every admin mutation, which
//! is what makes two admins acting on the same question safe: the loser of
//! the race gets `AlreadyHandled` instead of silently clobbering.

use crate::error::{CoreError, CoreResult};
use crate::store::{Category, Question, QuestionPatch, Status};
use std::collections::BTreeMap;
use std::collections::HashSet;

/// The fixed set of admin user ids, loaded from configuration.
#[derive(Debug, Clone)]
pub struct AdminRoster {
    ids: HashSet<i64>,
}

impl AdminRoster {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.ids.contains(&user_id)
    }

    pub fn authorize(&self, user_id: i64) -> CoreResult<()> {
        if self.is_admin(user_id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden)
        }
    }
}

/// An answer may only be started on a question that is still pending.
pub fn ensure_answerable(q: &Question) -> CoreResult<()> {
    if q.status == Status::Pending {
        Ok(())
    } else {
        Err(CoreError::AlreadyHandled(q.id.clone()))
    }
}

/// An answer edit only makes sense on a currently answered question.
pub fn ensure_editable(q: &Question) -> CoreResult<()> {
    if q.status == Status::Answered {
        Ok(())
    } else {
        Err(CoreError::AlreadyHandled(q.id.clone()))
    }
}

/// Reject a pending or answered question. An existing answer is retained
/// so a later restore does not lose it.
pub fn reject(q: &Question) -> CoreResult<QuestionPatch> {
    match q.status {
        Status::Pending | Status::Answered => Ok(QuestionPatch::status(Status::Rejected)),
        Status::Rejected => Err(CoreError::AlreadyHandled(q.id.clone())),
    }
}

/// Bring a rejected question back into the pending queue.
pub fn restore(q: &Question) -> CoreResult<QuestionPatch> {
    if q.status == Status::Rejected {
        Ok(QuestionPatch::status(Status::Pending))
    } else {
        Err(CoreError::AlreadyHandled(q.id.clone()))
    }
}

/// Importance is a free-floating flag, legal in any status.
pub fn toggle_important(q: &Question) -> QuestionPatch {
    QuestionPatch::important(!q.important)
}

/// Expanded statistics for the admin stats view. Derived from a full pass
/// over the question set rather than the incremental counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedStats {
    pub total: u64,
    pub pending: u64,
    pub answered: u64,
    pub rejected: u64,
    pub important: u64,
    pub by_category: BTreeMap<Category, u64>,
    /// Answered share of all questions, whole percent. Zero when empty.
    pub efficiency_pct: u64,
}

impl DetailedStats {
    pub fn compute<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Self {
        let mut stats = DetailedStats {
            total: 0,
            pending: 0,
            answered: 0,
            rejected: 0,
            important: 0,
            by_category: Category::ALL.iter().map(|c| (*c, 0)).collect(),
            efficiency_pct: 0,
        };
        for q in questions {
            stats.total += 1;
            match q.status {
                Status::Pending => stats.pending += 1,
                Status::Answered => stats.answered += 1,
                Status::Rejected => stats.rejected += 1,
            }
            if q.important {
                stats.important += 1;
            }
            *stats.by_category.entry(q.category).or_insert(0) += 1;
        }
        if stats.total > 0 {
            stats.efficiency_pct = stats.answered * 100 / stats.total;
        }
        stats
    }
}
