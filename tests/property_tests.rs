//! Property-based tests for the linkage engine.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Normalization is idempotent and masking ignores case and padding
//! - Source and action tags parse case-insensitively
//! - Random INSERT/UPDATE/DELETE/SEARCH sequences never leave an
//!   unreferenced record in the store
//! - Counter arithmetic of INSERT, UPDATE and DELETE

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use aadhaar_linkage::models::SOURCE_NOT_AVAILABLE;
use aadhaar_linkage::security::normalize;
use aadhaar_linkage::services::{DeleteOutcome, InsertKind};
use aadhaar_linkage::{
    Action, IdentityStore, InMemoryIdentityStore, LinkageKey, LinkageService, Pseudonymizer,
    Sha256Pseudonymizer, SourceType,
};
use proptest::prelude::*;
use std::collections::HashMap;

const FORENAMES: [&str; 3] = ["Asha", "Ravi", "Meera"];
const DOBS: [&str; 2] = ["1990-01-01", "1985-05-05"];
const ACTIONS: [Action; 4] = [Action::Insert, Action::Update, Action::Delete, Action::Search];

#[derive(Debug, Clone)]
enum Op {
    Insert { person: usize, source: usize },
    Update { key: usize, person: usize, source: usize },
    Delete { key: usize, source: usize },
    Search { key: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..6, 0usize..4).prop_map(|(person, source)| Op::Insert { person, source }),
        2 => (0usize..16, 0usize..6, 0usize..4)
            .prop_map(|(key, person, source)| Op::Update { key, person, source }),
        2 => (0usize..16, 0usize..4).prop_map(|(key, source)| Op::Delete { key, source }),
        1 => (0usize..16).prop_map(|key| Op::Search { key }),
    ]
}

fn person(index: usize) -> HashMap<String, String> {
    HashMap::from([
        (
            "forename".to_string(),
            FORENAMES[index % FORENAMES.len()].to_string(),
        ),
        ("dob".to_string(), DOBS[index % DOBS.len()].to_string()),
    ])
}

fn source(index: usize) -> SourceType {
    SourceType::all()[index % SourceType::all().len()]
}

fn pick(keys: &[LinkageKey], index: usize) -> Option<&LinkageKey> {
    if keys.is_empty() {
        None
    } else {
        keys.get(index % keys.len())
    }
}

proptest! {
    /// Property: normalization is idempotent.
    #[test]
    fn prop_normalize_idempotent(s in "[a-zA-Z0-9 \t-]{0,40}") {
        let once = normalize(&s);
        prop_assert_eq!(normalize(&once), once);
    }

    /// Property: masks ignore case and surrounding whitespace.
    #[test]
    fn prop_mask_ignores_case_and_padding(
        s in "[a-zA-Z0-9-]{1,30}",
        left in "[ \t]{0,3}",
        right in "[ \t]{0,3}",
    ) {
        let p = Sha256Pseudonymizer;
        let padded = format!("{left}{}{right}", s.to_uppercase());
        prop_assert_eq!(p.mask(&padded), p.mask(&s.to_lowercase()));
        prop_assert_eq!(p.mask(&s).len(), 64);
    }

    /// Property: source tags parse case-insensitively and round-trip.
    #[test]
    fn prop_source_parse_roundtrips(idx in 0usize..4, upper in any::<bool>()) {
        let source = SourceType::all()[idx];
        let tag = if upper {
            source.as_str().to_uppercase()
        } else {
            source.as_str().to_lowercase()
        };
        prop_assert_eq!(SourceType::parse(&tag), Some(source));
    }

    /// Property: action tags parse case-insensitively.
    #[test]
    fn prop_action_parse_roundtrips(idx in 0usize..4, pad in "[ ]{0,2}") {
        let action = ACTIONS[idx];
        let tag = format!("{pad}{}{pad}", action.as_str().to_lowercase());
        prop_assert_eq!(Action::parse(&tag), Some(action));
    }

    /// Property: no sequence of operations leaves an unreferenced record,
    /// and each operation moves counters as documented.
    #[test]
    fn prop_random_operations_preserve_invariants(
        ops in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let service = LinkageService::new(InMemoryIdentityStore::new(), Sha256Pseudonymizer);
        let mut keys: Vec<LinkageKey> = Vec::new();

        for op in ops {
            match op {
                Op::Insert { person: who, source: src } => {
                    let source = source(src);
                    let outcome = service.insert(source, Some(&person(who))).unwrap();
                    if outcome.kind == InsertKind::AlreadyLinked {
                        prop_assert_ne!(outcome.summary.counter(source), SOURCE_NOT_AVAILABLE);
                    } else {
                        prop_assert_eq!(outcome.summary.counter(source), "1");
                    }
                    if outcome.kind == InsertKind::Created {
                        keys.push(outcome.summary.key.clone());
                    }
                },
                Op::Update { key, person: who, source: src } => {
                    let Some(key) = pick(&keys, key).cloned() else { continue };
                    let source = source(src);
                    let before = service.store().get(&key).unwrap();
                    let result = service.update(&key, source, Some(&person(who)));

                    let Some(before) = before else {
                        prop_assert!(result.is_err());
                        continue;
                    };
                    let fork = result.unwrap();
                    let new = service.store().get(&fork.new_key).unwrap().unwrap();
                    prop_assert_eq!(new.counter(source), before.counter(source) + 1);
                    for other in SourceType::all().iter().filter(|s| **s != source) {
                        prop_assert_eq!(new.counter(*other), before.counter(*other));
                    }

                    let old = service.store().get(&key).unwrap();
                    prop_assert_eq!(old.is_none(), fork.previous_retired);
                    if let Some(old) = old {
                        prop_assert_eq!(
                            old.counter(source),
                            before.counter(source).saturating_sub(1)
                        );
                    }
                    keys.push(fork.new_key);
                },
                Op::Delete { key, source: src } => {
                    let Some(key) = pick(&keys, key).cloned() else { continue };
                    let source = source(src);
                    match service.delete(&key, source) {
                        Ok(DeleteOutcome::Removed(removed)) => {
                            prop_assert_eq!(&removed, &key);
                            prop_assert!(service.store().get(&key).unwrap().is_none());
                        },
                        Ok(DeleteOutcome::Unlinked(summary)) => {
                            prop_assert_eq!(summary.counter(source), SOURCE_NOT_AVAILABLE);
                        },
                        Err(_) => prop_assert!(service.store().get(&key).unwrap().is_none()),
                    }
                },
                Op::Search { key } => {
                    let Some(key) = pick(&keys, key).cloned() else { continue };
                    let stored = service.store().get(&key).unwrap();
                    prop_assert_eq!(service.search(&key).is_ok(), stored.is_some());
                },
            }

            for key in service.store().list_keys().unwrap() {
                let record = service.store().get(&key).unwrap().unwrap();
                prop_assert!(!record.is_unreferenced(), "unreferenced record {}", key);
            }
        }
    }
}
