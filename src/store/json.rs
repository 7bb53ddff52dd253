//! Document-file backend
//!
//! Persists the whole store as a single JSON document:
//! `{"questions": {"q1": {...}}, "stats": {...}}`. Every flush rewrites the
//! file through a temp-file-and-rename so a crash mid-write can never leave
//! a torn document behind.

use super::types::{Question, Snapshot, Stats};
use super::{parse_seq, Backend, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct FileDoc {
    questions: BTreeMap<String, Question>,
    stats: Stats,
}

pub struct JsonBackend {
    path: PathBuf,
}

impl JsonBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Backend for JsonBackend {
    fn load(&mut self) -> Result<Option<Snapshot>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let doc: FileDoc = serde_json::from_str(&raw)?;

        // The JSON map is keyed by id; creation order is the numeric part
        // of the id, not the lexicographic key order ("q10" < "q2").
        let mut questions: Vec<Question> = doc.questions.into_values().collect();
        questions.sort_by_key(|q| parse_seq(&q.id).unwrap_or(u64::MAX));

        Ok(Some(Snapshot {
            questions,
            stats: doc.stats,
        }))
    }

    fn flush(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let doc = FileDoc {
            questions: snapshot
                .questions
                .iter()
                .map(|q| (q.id.clone(), q.clone()))
                .collect(),
            stats: snapshot.stats.clone(),
        };
        let raw = serde_json::to_string_pretty(&doc)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn backup(&self, dir: &Path, stamp: &str) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(dir)?;
        let name = self
            .path
            .file_name()
            .map_or_else(|| "store.json".to_string(), |n| n.to_string_lossy().into_owned());
        let dest = dir.join(format!("backup_{stamp}_{name}"));
        fs::copy(&self.path, &dest)?;
        Ok(dest)
    }
}
