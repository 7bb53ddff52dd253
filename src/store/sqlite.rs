//! Embedded-relational backend
//!
//! Same logical schema as the document file: a `questions` table keyed by
//! id plus a `stats` key/value table (`total_questions`,
//! `answered_questions`, `category_<id>`). A flush rewrites both tables in
//! a single transaction, so readers of the file only ever see a committed,
//! complete store.

use super::types::{Category, Question, Snapshot, Stats};
use super::{Backend, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS questions (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    text TEXT NOT NULL,
    status TEXT NOT NULL,
    important INTEGER NOT NULL DEFAULT 0,
    user_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    answer TEXT,
    answer_time TEXT,
    published_message_id INTEGER
);

CREATE TABLE IF NOT EXISTS stats (
    key TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
";

pub struct SqliteBackend {
    conn: Connection,
    path: PathBuf,
}

impl SqliteBackend {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path })
    }
}

impl Backend for SqliteBackend {
    fn load(&mut self) -> Result<Option<Snapshot>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, category, text, status, important, user_id, created_at,
                    answer, answer_time, published_message_id
             FROM questions",
        )?;

        type Raw = (
            String,
            String,
            String,
            String,
            bool,
            i64,
            String,
            Option<String>,
            Option<String>,
            Option<i64>,
        );
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, Option<i64>>(9)?,
            ))
        })?;

        let mut questions = Vec::new();
        for row in rows {
            let raw: Raw = row?;
            questions.push(Question {
                id: raw.0,
                category: Category::from_str(&raw.1).map_err(StoreError::Corrupt)?,
                text: raw.2,
                status: raw.3.parse().map_err(StoreError::Corrupt)?,
                important: raw.4,
                user_id: raw.5,
                created_at: parse_datetime(&raw.6),
                answer: raw.7,
                answer_time: raw.8.as_deref().map(parse_datetime),
                published_message_id: raw.9,
            });
        }
        drop(stmt);

        questions.sort_by_key(|q| super::parse_seq(&q.id).unwrap_or(u64::MAX));

        let mut stats = Stats::zeroed();
        let mut stmt = self.conn.prepare("SELECT key, value FROM stats")?;
        let stat_rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in stat_rows {
            let (key, value) = row?;
            let value = u64::try_from(value).unwrap_or(0);
            match key.as_str() {
                "total_questions" => stats.total = value,
                "answered_questions" => stats.answered = value,
                other => {
                    if let Some(cat) = other.strip_prefix("category_") {
                        if let Ok(cat) = Category::from_str(cat) {
                            stats.categories.insert(cat, value);
                        }
                    }
                }
            }
        }
        drop(stmt);

        Ok(Some(Snapshot { questions, stats }))
    }

    fn flush(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        // Questions are never deleted from the store, but a full rewrite
        // keeps this backend trivially equivalent to the document file.
        tx.execute("DELETE FROM questions", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO questions
                     (id, category, text, status, important, user_id, created_at,
                      answer, answer_time, published_message_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for q in &snapshot.questions {
                insert.execute(params![
                    q.id,
                    q.category.as_str(),
                    q.text,
                    q.status.as_str(),
                    q.important,
                    q.user_id,
                    q.created_at.to_rfc3339(),
                    q.answer,
                    q.answer_time.map(|t| t.to_rfc3339()),
                    q.published_message_id,
                ])?;
            }

            let mut upsert = tx.prepare("INSERT OR REPLACE INTO stats (key, value) VALUES (?1, ?2)")?;
            upsert.execute(params![
                "total_questions",
                i64::try_from(snapshot.stats.total).unwrap_or(i64::MAX)
            ])?;
            upsert.execute(params![
                "answered_questions",
                i64::try_from(snapshot.stats.answered).unwrap_or(i64::MAX)
            ])?;
            for cat in Category::ALL {
                upsert.execute(params![
                    format!("category_{cat}"),
                    i64::try_from(snapshot.stats.category(cat)).unwrap_or(i64::MAX)
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn backup(&self, dir: &Path, stamp: &str) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(dir)?;
        let name = self
            .path
            .file_name()
            .map_or_else(|| "store.db".to_string(), |n| n.to_string_lossy().into_owned());
        let dest = dir.join(format!("backup_{stamp}_{name}"));
        // Every mutation commits before the store lock is released, so a
        // plain file copy taken under that lock is a consistent snapshot.
        fs::copy(&self.path, &dest)?;
        Ok(dest)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
