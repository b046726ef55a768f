//! Property-based tests for the profile store
//!
//! Whatever sequence of adds and removes runs, ids stay unique, order is
//! insertion order, and a reload from disk sees the same list.

use hostwatch_core::error::ProfileError;
use hostwatch_core::models::{AuthMethod, SavedServerProfile, ServerProfile};
use hostwatch_core::profiles::ProfileStore;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    Remove(u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![(0u8..8).prop_map(Op::Add), (0u8..8).prop_map(Op::Remove)]
}

fn saved(n: u8) -> SavedServerProfile {
    SavedServerProfile::new(
        ServerProfile::new(
            format!("server-{n}"),
            format!("10.0.0.{n}"),
            22,
            "root",
            AuthMethod::Password {
                password: "pw".to_string(),
            },
        )
        .with_id(format!("id-{n}")),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(arb_op(), 0..30)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server_profiles.json");
        let store = ProfileStore::load(&path).unwrap();
        let mut model: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                Op::Add(n) => {
                    let result = store.add(saved(n));
                    if model.contains(&n) {
                        prop_assert_eq!(result, Err(ProfileError::DuplicateId(format!("id-{n}"))));
                    } else {
                        prop_assert!(result.is_ok());
                        model.push(n);
                    }
                }
                Op::Remove(n) => {
                    let result = store.remove(&format!("id-{n}"));
                    if let Some(pos) = model.iter().position(|m| *m == n) {
                        prop_assert!(result.is_ok());
                        model.remove(pos);
                    } else {
                        prop_assert_eq!(result, Err(ProfileError::NotFound(format!("id-{n}"))));
                    }
                }
            }
        }

        let ids: Vec<String> = store.list().iter().map(|p| p.id().to_string()).collect();
        let expected: Vec<String> = model.iter().map(|n| format!("id-{n}")).collect();
        prop_assert_eq!(&ids, &expected);

        let reloaded = ProfileStore::load(&path).unwrap();
        let reloaded_ids: Vec<String> =
            reloaded.list().iter().map(|p| p.id().to_string()).collect();
        prop_assert_eq!(reloaded_ids, expected);
    }
}
