//! Question store
//!
//! Durable keyed record store with aggregate counters. Two interchangeable
//! backends persist the same logical layout: a single JSON document file
//! and an embedded sqlite file. All access goes through one mutex around
//! the in-memory representation, and every mutation flushes synchronously
//! while holding it, so the in-memory state and the durable copy are never
//! observably inconsistent to another caller. Question volume is
//! human-scale chat traffic, which is why this trades throughput for
//! simplicity.

mod json;
mod sqlite;
pub mod types;

#[cfg(test)]
mod proptests;

pub use types::{Category, MessageRef, Question, QuestionPatch, Snapshot, Stats, Status};

use chrono::Utc;
use json::JsonBackend;
use sqlite::SqliteBackend;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("question not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid store document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("migration row count mismatch: expected {expected}, destination has {actual}")]
    MigrationMismatch { expected: usize, actual: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which durable backend a store instance writes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Json,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Json => "json",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(BackendKind::Json),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(format!("unknown backend: {other} (expected json or sqlite)")),
        }
    }
}

/// Numeric part of a `q<sequence>` id. Creation order is defined by this,
/// not by lexicographic id order.
pub(crate) fn parse_seq(id: &str) -> Option<u64> {
    id.strip_prefix('q').and_then(|n| n.parse().ok())
}

trait Backend: Send {
    /// Read the durable copy. `None` means no file exists yet.
    fn load(&mut self) -> StoreResult<Option<Snapshot>>;
    /// Rewrite the durable copy from the given snapshot.
    fn flush(&mut self, snapshot: &Snapshot) -> StoreResult<()>;
    /// Copy the durable file into `dir` under a stamped name.
    fn backup(&self, dir: &Path, stamp: &str) -> StoreResult<PathBuf>;
}

fn open_backend(kind: BackendKind, path: &Path) -> StoreResult<Box<dyn Backend>> {
    Ok(match kind {
        BackendKind::Json => Box::new(JsonBackend::new(path)),
        BackendKind::Sqlite => Box::new(SqliteBackend::open(path)?),
    })
}

struct Inner {
    questions: BTreeMap<u64, Question>,
    stats: Stats,
    backend: Box<dyn Backend>,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            questions: self.questions.values().cloned().collect(),
            stats: self.stats.clone(),
        }
    }

    fn flush(&mut self) -> StoreResult<()> {
        let snapshot = self.snapshot();
        self.backend.flush(&snapshot)
    }
}

/// Shared handle to the question store. Cloning shares the same state and
/// the same lock.
#[derive(Clone)]
pub struct QuestionStore {
    inner: Arc<Mutex<Inner>>,
    kind: BackendKind,
}

impl QuestionStore {
    /// Open (or create) a store at `path` using the given backend.
    pub fn open(kind: BackendKind, path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let mut backend = open_backend(kind, path)?;
        let loaded = backend.load()?;

        let mut inner = Inner {
            questions: BTreeMap::new(),
            stats: Stats::zeroed(),
            backend,
        };

        match loaded {
            Some(snapshot) => {
                for q in snapshot.questions {
                    let seq = parse_seq(&q.id)
                        .ok_or_else(|| StoreError::Corrupt(format!("bad question id: {}", q.id)))?;
                    inner.questions.insert(seq, q);
                }
                inner.stats = snapshot.stats;
                for cat in Category::ALL {
                    inner.stats.categories.entry(cat).or_insert(0);
                }
            }
            // No file yet: write an empty store eagerly so the durable
            // copy exists from the first moment.
            None => inner.flush()?,
        }

        tracing::info!(
            backend = kind.as_str(),
            path = %path.display(),
            questions = inner.questions.len(),
            "question store opened"
        );
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            kind,
        })
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    /// Create a new pending question. Counters are bumped and the store is
    /// flushed before this returns; on flush failure the in-memory change
    /// is rolled back and the question does not exist.
    pub fn create(
        &self,
        category: Category,
        text: impl Into<String>,
        user_id: i64,
    ) -> StoreResult<Question> {
        let text = text.into();
        let mut inner = self.inner.lock().unwrap();

        let seq = inner.questions.keys().next_back().copied().unwrap_or(0) + 1;
        let question = Question {
            id: format!("q{seq}"),
            category,
            text,
            status: Status::Pending,
            important: false,
            user_id,
            created_at: Utc::now(),
            answer: None,
            answer_time: None,
            published_message_id: None,
        };

        inner.questions.insert(seq, question.clone());
        inner.stats.total += 1;
        *inner.stats.categories.entry(category).or_insert(0) += 1;

        if let Err(err) = inner.flush() {
            inner.questions.remove(&seq);
            inner.stats.total -= 1;
            if let Some(count) = inner.stats.categories.get_mut(&category) {
                *count -= 1;
            }
            return Err(err);
        }

        tracing::info!(id = %question.id, category = %category, "question created");
        Ok(question)
    }

    pub fn get(&self, id: &str) -> StoreResult<Question> {
        let inner = self.inner.lock().unwrap();
        parse_seq(id)
            .and_then(|seq| inner.questions.get(&seq))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Apply a merge-patch to an existing question.
    ///
    /// The answered counter increments exactly when this update answers a
    /// question for the first time (it gains an answer while moving into
    /// `answered`). Re-saving an already-answered question, or answering
    /// again after a reject/restore cycle, never double-counts.
    pub fn update(&self, id: &str, patch: QuestionPatch) -> StoreResult<Question> {
        let mut inner = self.inner.lock().unwrap();

        let seq = parse_seq(id)
            .filter(|seq| inner.questions.contains_key(seq))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let before = inner.questions[&seq].clone();
        let mut after = before.clone();
        if let Some(status) = patch.status {
            after.status = status;
        }
        if let Some(answer) = patch.answer {
            after.answer = Some(answer);
        }
        if let Some(answer_time) = patch.answer_time {
            after.answer_time = Some(answer_time);
        }
        if let Some(important) = patch.important {
            after.important = important;
        }
        if let Some(message_id) = patch.published_message_id {
            after.published_message_id = Some(message_id);
        }

        let newly_answered = after.status == Status::Answered
            && before.status != Status::Answered
            && before.answer.is_none();

        inner.questions.insert(seq, after.clone());
        if newly_answered {
            inner.stats.answered += 1;
        }

        if let Err(err) = inner.flush() {
            inner.questions.insert(seq, before);
            if newly_answered {
                inner.stats.answered -= 1;
            }
            return Err(err);
        }

        tracing::info!(id = %after.id, status = %after.status, "question updated");
        Ok(after)
    }

    /// Questions with the given status, in creation order.
    pub fn list_by_status(&self, status: Status) -> Vec<Question> {
        let inner = self.inner.lock().unwrap();
        inner
            .questions
            .values()
            .filter(|q| q.status == status)
            .cloned()
            .collect()
    }

    /// Questions submitted by one user, in creation order.
    pub fn list_by_user(&self, user_id: i64) -> Vec<Question> {
        let inner = self.inner.lock().unwrap();
        inner
            .questions
            .values()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn list_important(&self) -> Vec<Question> {
        let inner = self.inner.lock().unwrap();
        inner
            .questions
            .values()
            .filter(|q| q.important)
            .cloned()
            .collect()
    }

    pub fn list_all(&self) -> Vec<Question> {
        let inner = self.inner.lock().unwrap();
        inner.questions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot copy of the aggregate counters.
    pub fn stats(&self) -> Stats {
        self.inner.lock().unwrap().stats.clone()
    }

    /// Copy the durable file into `dir` under a timestamped name. Holds the
    /// store lock for the duration of the copy so the backup is a
    /// consistent snapshot.
    pub fn backup(&self, dir: impl AsRef<Path>) -> StoreResult<PathBuf> {
        let inner = self.inner.lock().unwrap();
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let path = inner.backend.backup(dir.as_ref(), &stamp)?;
        tracing::info!(path = %path.display(), "store backup written");
        Ok(path)
    }

    /// Copy every question plus freshly recomputed stats into a new store
    /// at `path` using the other (or same) backend, then re-open the
    /// destination from disk and verify the row count before declaring
    /// success.
    pub fn migrate_to(&self, kind: BackendKind, path: impl AsRef<Path>) -> StoreResult<QuestionStore> {
        let path = path.as_ref();
        let snapshot = {
            let inner = self.inner.lock().unwrap();
            Snapshot {
                questions: inner.questions.values().cloned().collect(),
                stats: Stats::recount(inner.questions.values()),
            }
        };
        let expected = snapshot.questions.len();

        let mut backend = open_backend(kind, path)?;
        backend.flush(&snapshot)?;
        drop(backend);

        let dest = QuestionStore::open(kind, path)?;
        let actual = dest.len();
        if actual != expected {
            return Err(StoreError::MigrationMismatch { expected, actual });
        }

        tracing::info!(
            to = kind.as_str(),
            path = %path.display(),
            questions = actual,
            "store migrated"
        );
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_json(dir: &Path) -> QuestionStore {
        QuestionStore::open(BackendKind::Json, dir.join("store.json")).unwrap()
    }

    fn open_sqlite(dir: &Path) -> QuestionStore {
        QuestionStore::open(BackendKind::Sqlite, dir.join("store.db")).unwrap()
    }

    #[test]
    fn create_assigns_ids_and_counters() {
        let dir = tempdir().unwrap();
        let store = open_json(dir.path());

        let q1 = store.create(Category::Urgent, "Need help", 10).unwrap();
        let q2 = store.create(Category::General, "Second", 11).unwrap();

        assert_eq!(q1.id, "q1");
        assert_eq!(q2.id, "q2");
        assert_eq!(q1.status, Status::Pending);
        assert!(!q1.important);

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.answered, 0);
        assert_eq!(stats.category(Category::Urgent), 1);
        assert_eq!(stats.category(Category::General), 1);
    }

    #[test]
    fn reopen_preserves_questions_and_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        {
            let store = QuestionStore::open(BackendKind::Json, &path).unwrap();
            // Past ten questions the lexicographic id order ("q10" < "q2")
            // diverges from creation order.
            for i in 0..12 {
                store
                    .create(Category::General, format!("question {i}"), i)
                    .unwrap();
            }
        }

        let store = QuestionStore::open(BackendKind::Json, &path).unwrap();
        let all = store.list_all();
        assert_eq!(all.len(), 12);
        let ids: Vec<&str> = all.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids[0], "q1");
        assert_eq!(ids[1], "q2");
        assert_eq!(ids[10], "q11");
        assert_eq!(ids[11], "q12");

        // Fresh ids continue the sequence instead of reusing it.
        let next = store.create(Category::Urgent, "more", 99).unwrap();
        assert_eq!(next.id, "q13");
    }

    #[test]
    fn sqlite_backend_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let store = QuestionStore::open(BackendKind::Sqlite, &path).unwrap();
            let q = store.create(Category::Spiritual, "Why?", 5).unwrap();
            store
                .update(
                    &q.id,
                    QuestionPatch {
                        status: Some(Status::Answered),
                        answer: Some("Because.".to_string()),
                        answer_time: Some(Utc::now()),
                        published_message_id: Some(42),
                        ..QuestionPatch::default()
                    },
                )
                .unwrap();
        }

        let store = QuestionStore::open(BackendKind::Sqlite, &path).unwrap();
        let q = store.get("q1").unwrap();
        assert_eq!(q.status, Status::Answered);
        assert_eq!(q.answer.as_deref(), Some("Because."));
        assert_eq!(q.published_message_id, Some(42));
        assert_eq!(store.stats().answered, 1);
    }

    #[test]
    fn get_unknown_is_not_found() {
        let dir = tempdir().unwrap();
        let store = open_json(dir.path());
        assert!(matches!(store.get("q7"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update("q7", QuestionPatch::status(Status::Rejected)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn answered_counter_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = open_json(dir.path());
        let q = store.create(Category::General, "Q", 1).unwrap();

        let answer = QuestionPatch {
            status: Some(Status::Answered),
            answer: Some("A".to_string()),
            answer_time: Some(Utc::now()),
            ..QuestionPatch::default()
        };
        store.update(&q.id, answer.clone()).unwrap();
        assert_eq!(store.stats().answered, 1);

        // Re-applying the same transition must not double-count.
        store.update(&q.id, answer).unwrap();
        assert_eq!(store.stats().answered, 1);

        // Neither does an answer edit.
        store
            .update(
                &q.id,
                QuestionPatch {
                    answer: Some("A2".to_string()),
                    answer_time: Some(Utc::now()),
                    ..QuestionPatch::default()
                },
            )
            .unwrap();
        assert_eq!(store.stats().answered, 1);
    }

    #[test]
    fn reject_then_restore_keeps_answer() {
        let dir = tempdir().unwrap();
        let store = open_json(dir.path());
        let q = store.create(Category::Personal, "Q", 1).unwrap();
        store
            .update(
                &q.id,
                QuestionPatch {
                    status: Some(Status::Answered),
                    answer: Some("kept".to_string()),
                    ..QuestionPatch::default()
                },
            )
            .unwrap();

        store.update(&q.id, QuestionPatch::status(Status::Rejected)).unwrap();
        let q = store.get("q1").unwrap();
        assert_eq!(q.status, Status::Rejected);
        assert_eq!(q.answer.as_deref(), Some("kept"));

        store.update(&q.id, QuestionPatch::status(Status::Pending)).unwrap();
        let q = store.get("q1").unwrap();
        assert_eq!(q.status, Status::Pending);
        assert_eq!(q.answer.as_deref(), Some("kept"));

        // Counters still agree with a full recount.
        assert_eq!(store.stats(), Stats::recount(&store.list_all()));
    }

    #[test]
    fn list_filters_preserve_creation_order() {
        let dir = tempdir().unwrap();
        let store = open_json(dir.path());
        store.create(Category::General, "a", 1).unwrap();
        store.create(Category::General, "b", 2).unwrap();
        store.create(Category::General, "c", 1).unwrap();
        store.update("q2", QuestionPatch::status(Status::Rejected)).unwrap();
        store.update("q3", QuestionPatch::important(true)).unwrap();

        let pending: Vec<_> = store
            .list_by_status(Status::Pending)
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(pending, vec!["q1", "q3"]);

        let mine: Vec<_> = store.list_by_user(1).into_iter().map(|q| q.id).collect();
        assert_eq!(mine, vec!["q1", "q3"]);

        let important: Vec<_> = store.list_important().into_iter().map(|q| q.id).collect();
        assert_eq!(important, vec!["q3"]);
    }

    #[test]
    fn stats_snapshot_is_a_copy() {
        let dir = tempdir().unwrap();
        let store = open_json(dir.path());
        store.create(Category::General, "a", 1).unwrap();

        let mut snapshot = store.stats();
        snapshot.total = 999;
        assert_eq!(store.stats().total, 1);
    }

    #[test]
    fn backup_writes_stamped_copy() {
        let dir = tempdir().unwrap();
        let store = open_json(dir.path());
        store.create(Category::General, "a", 1).unwrap();

        let backup_dir = dir.path().join("backups");
        let path = store.backup(&backup_dir).unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("backup_"));
    }

    #[test]
    fn migration_round_trip_preserves_everything() {
        let dir = tempdir().unwrap();
        let source = open_json(dir.path());
        source.create(Category::Urgent, "first", 1).unwrap();
        source.create(Category::General, "second", 2).unwrap();
        source
            .update(
                "q1",
                QuestionPatch {
                    status: Some(Status::Answered),
                    answer: Some("done".to_string()),
                    answer_time: Some(Utc::now()),
                    published_message_id: Some(7),
                    important: Some(true),
                },
            )
            .unwrap();

        let sqlite = source
            .migrate_to(BackendKind::Sqlite, dir.path().join("migrated.db"))
            .unwrap();
        assert_eq!(sqlite.stats(), source.stats());

        let back = sqlite
            .migrate_to(BackendKind::Json, dir.path().join("back.json"))
            .unwrap();

        let original = source.list_all();
        let round_tripped = back.list_all();
        assert_eq!(original.len(), round_tripped.len());
        for (a, b) in original.iter().zip(&round_tripped) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.category, b.category);
            assert_eq!(a.text, b.text);
            assert_eq!(a.status, b.status);
            assert_eq!(a.important, b.important);
            assert_eq!(a.user_id, b.user_id);
            assert_eq!(a.answer, b.answer);
            assert_eq!(a.published_message_id, b.published_message_id);
        }
        assert_eq!(back.stats(), source.stats());
    }

    #[test]
    fn both_backends_agree_on_queries() {
        let dir = tempdir().unwrap();
        let json = open_json(dir.path());
        let sqlite = open_sqlite(dir.path());

        for store in [&json, &sqlite] {
            store.create(Category::Urgent, "x", 1).unwrap();
            store.create(Category::Personal, "y", 2).unwrap();
            store.update("q1", QuestionPatch::status(Status::Rejected)).unwrap();
        }

        assert_eq!(json.stats(), sqlite.stats());
        assert_eq!(
            json.list_by_status(Status::Rejected).len(),
            sqlite.list_by_status(Status::Rejected).len()
        );
        let a = json.get("q2").unwrap();
        let b = sqlite.get("q2").unwrap();
        assert_eq!(a.category, b.category);
        assert_eq!(a.text, b.text);
        assert_eq!(a.status, b.status);
    }
}
