//! Property tests over arbitrary lifecycle histories.
//!
//! Drives a store through random create/answer/reject/restore sequences and
//! checks that the incrementally maintained counters never drift from a
//! full recount.

use super::{BackendKind, Category, QuestionPatch, QuestionStore, Stats, Status};
use crate::rules::DetailedStats;
use chrono::Utc;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Create(Category, i64),
    Answer(u64),
    Reject(u64),
    Restore(u64),
    ToggleImportant(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4, 1i64..20).prop_map(|(c, u)| Op::Create(Category::ALL[c], u)),
        (1u64..30).prop_map(Op::Answer),
        (1u64..30).prop_map(Op::Reject),
        (1u64..30).prop_map(Op::Restore),
        (1u64..30).prop_map(Op::ToggleImportant),
    ]
}

fn apply(store: &QuestionStore, op: &Op) {
    match op {
        Op::Create(category, user) => {
            store.create(*category, "generated", *user).unwrap();
        }
        Op::Answer(seq) => {
            let id = format!("q{seq}");
            if store.get(&id).is_ok() {
                store
                    .update(
                        &id,
                        QuestionPatch {
                            status: Some(Status::Answered),
                            answer: Some("generated answer".to_string()),
                            answer_time: Some(Utc::now()),
                            ..QuestionPatch::default()
                        },
                    )
                    .unwrap();
            }
        }
        Op::Reject(seq) => {
            let id = format!("q{seq}");
            if store.get(&id).is_ok() {
                store.update(&id, QuestionPatch::status(Status::Rejected)).unwrap();
            }
        }
        Op::Restore(seq) => {
            let id = format!("q{seq}");
            if store.get(&id).is_ok() {
                store.update(&id, QuestionPatch::status(Status::Pending)).unwrap();
            }
        }
        Op::ToggleImportant(seq) => {
            let id = format!("q{seq}");
            if let Ok(q) = store.get(&id) {
                store.update(&id, QuestionPatch::important(!q.important)).unwrap();
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn counters_never_drift(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let dir = tempfile::tempdir().unwrap();
        let store = QuestionStore::open(BackendKind::Json, dir.path().join("store.json")).unwrap();

        for op in &ops {
            apply(&store, op);
        }

        let all = store.list_all();
        let stats = store.stats();
        prop_assert_eq!(stats.clone(), Stats::recount(&all));
        prop_assert_eq!(stats.total as usize, all.len());
        prop_assert_eq!(
            stats.categories.values().sum::<u64>(),
            stats.total
        );
        prop_assert!(stats.answered <= stats.total);

        let detailed = DetailedStats::compute(&all);
        prop_assert!(detailed.efficiency_pct <= 100);
        prop_assert_eq!(
            detailed.pending + detailed.answered + detailed.rejected,
            detailed.total
        );
    }

    #[test]
    fn counters_survive_reopen(ops in proptest::collection::vec(op_strategy(), 0..25)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let before = {
            let store = QuestionStore::open(BackendKind::Json, &path).unwrap();
            for op in &ops {
                apply(&store, op);
            }
            store.stats()
        };

        let store = QuestionStore::open(BackendKind::Json, &path).unwrap();
        prop_assert_eq!(store.stats(), before);
        prop_assert_eq!(store.stats(), Stats::recount(&store.list_all()));
    }
}
