// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Registry behavior against SQLite stores.

use std::sync::Arc;

use roster_core::registry::{self, Renumbering};
use roster_core::{Collection, Payload, PoolSettings, SqliteStore, Store};

async fn test_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::in_memory()
            .await
            .expect("Failed to create in-memory store"),
    )
}

/// Create one student per name, in order.
async fn seed_students(store: &SqliteStore, names: &[&str]) {
    for name in names {
        let payload = Payload::from_pairs(Collection::Student, [("name", *name)]);
        registry::create(store, &payload).await.unwrap();
    }
}

async fn current_ids(store: &SqliteStore, collection: Collection) -> Vec<i64> {
    registry::list(store, collection)
        .await
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect()
}

async fn id_name_pairs(store: &SqliteStore, collection: Collection) -> Vec<(i64, String)> {
    registry::list(store, collection)
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.id, e.field("name").unwrap_or_default().to_string()))
        .collect()
}

fn pairs(expected: &[(i64, &str)]) -> Vec<(i64, String)> {
    expected
        .iter()
        .map(|(id, name)| (*id, name.to_string()))
        .collect()
}

#[tokio::test]
async fn test_assign_next_id_empty_collection() {
    let store = test_store().await;

    let next = registry::assign_next_id(store.as_ref(), Collection::Student)
        .await
        .unwrap();
    assert_eq!(next, 1);
}

#[tokio::test]
async fn test_assign_insert_assign() {
    let store = test_store().await;

    let first = registry::assign_next_id(store.as_ref(), Collection::Teacher)
        .await
        .unwrap();
    assert_eq!(first, 1);

    let mut tx = store.begin(Collection::Teacher).await.unwrap();
    let payload = Payload::from_pairs(Collection::Teacher, [("name", "Mrs. Rao")]);
    tx.insert_row(first, &payload).await.unwrap();
    tx.commit().await.unwrap();

    let second = registry::assign_next_id(store.as_ref(), Collection::Teacher)
        .await
        .unwrap();
    assert_eq!(second, 2);
}

#[tokio::test]
async fn test_assign_next_id_is_n_plus_one() {
    let store = test_store().await;
    seed_students(&store, &["A", "B", "C", "D", "E"]).await;

    let next = registry::assign_next_id(store.as_ref(), Collection::Student)
        .await
        .unwrap();
    assert_eq!(next, 6);
}

#[tokio::test]
async fn test_create_assigns_sequential_ids() {
    let store = test_store().await;

    for expected in 1..=3 {
        let payload = Payload::from_pairs(Collection::Student, [("name", "X")]);
        let id = registry::create(store.as_ref(), &payload).await.unwrap();
        assert_eq!(id, expected);
    }

    // Teacher ids are an independent namespace.
    let payload = Payload::from_pairs(Collection::Teacher, [("name", "Y")]);
    let id = registry::create(store.as_ref(), &payload).await.unwrap();
    assert_eq!(id, 1);
}

#[tokio::test]
async fn test_remove_middle_scenario() {
    let store = test_store().await;
    seed_students(&store, &["A", "B", "C", "D"]).await;

    let report = registry::remove_and_compact(store.as_ref(), Collection::Student, 2)
        .await
        .unwrap();

    assert!(report.removed);
    assert_eq!(report.remaining, 3);
    assert_eq!(
        report.renumbered,
        vec![
            Renumbering { from: 3, to: 2 },
            Renumbering { from: 4, to: 3 },
        ]
    );
    assert_eq!(
        id_name_pairs(&store, Collection::Student).await,
        pairs(&[(1, "A"), (2, "C"), (3, "D")])
    );
}

#[tokio::test]
async fn test_remove_preserves_lower_and_shifts_higher() {
    let names = ["A", "B", "C", "D", "E", "F"];

    for k in 1..=names.len() as i64 {
        let store = test_store().await;
        seed_students(&store, &names).await;

        registry::remove_and_compact(store.as_ref(), Collection::Student, k)
            .await
            .unwrap();

        let after = id_name_pairs(&store, Collection::Student).await;
        let ids: Vec<i64> = after.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, (1..names.len() as i64).collect::<Vec<_>>());

        for (prior_idx, name) in names.iter().enumerate() {
            let prior_id = prior_idx as i64 + 1;
            let now = after.iter().find(|(_, n)| n == name).map(|(id, _)| *id);
            if prior_id < k {
                assert_eq!(now, Some(prior_id), "row {} moved", name);
            } else if prior_id > k {
                assert_eq!(now, Some(prior_id - 1), "row {} not shifted", name);
            } else {
                assert_eq!(now, None, "removed row {} still present", name);
            }
        }
    }
}

#[tokio::test]
async fn test_remove_last_row_renumbers_nothing() {
    let store = test_store().await;
    seed_students(&store, &["A", "B", "C"]).await;

    let report = registry::remove_and_compact(store.as_ref(), Collection::Student, 3)
        .await
        .unwrap();

    assert!(report.removed);
    assert!(report.renumbered.is_empty());
    assert_eq!(current_ids(&store, Collection::Student).await, vec![1, 2]);
}

#[tokio::test]
async fn test_remove_absent_id_is_noop_and_idempotent() {
    let store = test_store().await;
    seed_students(&store, &["A", "B", "C"]).await;
    let before = id_name_pairs(&store, Collection::Student).await;

    let first = registry::remove_and_compact(store.as_ref(), Collection::Student, 42)
        .await
        .unwrap();
    let after_first = id_name_pairs(&store, Collection::Student).await;

    let second = registry::remove_and_compact(store.as_ref(), Collection::Student, 42)
        .await
        .unwrap();
    let after_second = id_name_pairs(&store, Collection::Student).await;

    assert!(!first.removed);
    assert!(!second.removed);
    assert!(first.renumbered.is_empty());
    assert_eq!(first, second);
    assert_eq!(before, after_first);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_remove_from_empty_collection() {
    let store = test_store().await;

    let report = registry::remove_and_compact(store.as_ref(), Collection::Teacher, 1)
        .await
        .unwrap();

    assert!(!report.removed);
    assert_eq!(report.remaining, 0);
}

#[tokio::test]
async fn test_remove_then_create_reuses_tail_id() {
    let store = test_store().await;
    seed_students(&store, &["A", "B", "C"]).await;

    registry::remove_and_compact(store.as_ref(), Collection::Student, 1)
        .await
        .unwrap();

    let payload = Payload::from_pairs(Collection::Student, [("name", "D")]);
    let id = registry::create(store.as_ref(), &payload).await.unwrap();
    assert_eq!(id, 3);
    assert_eq!(
        id_name_pairs(&store, Collection::Student).await,
        pairs(&[(1, "B"), (2, "C"), (3, "D")])
    );
}

/// The bare read-then-insert race: without coordination both callers see the
/// same max id and pick the same next id.
#[tokio::test]
async fn test_concurrent_assign_next_id_can_collide() {
    let store = test_store().await;
    seed_students(&store, &["A", "B", "C", "D", "E"]).await;

    let (a, b) = tokio::join!(
        registry::assign_next_id(store.as_ref(), Collection::Student),
        registry::assign_next_id(store.as_ref(), Collection::Student),
    );

    assert_eq!(a.unwrap(), 6);
    assert_eq!(b.unwrap(), 6);
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_ids() {
    let store = test_store().await;
    seed_students(&store, &["A", "B", "C", "D", "E"]).await;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let name = format!("N{}", i);
                let payload = Payload::from_pairs(Collection::Student, [("name", name.as_str())]);
                registry::create(store.as_ref(), &payload).await
            })
        })
        .collect();

    let mut ids: Vec<i64> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    ids.sort_unstable();

    assert_eq!(ids, (6..=13).collect::<Vec<_>>());
    assert_eq!(
        current_ids(&store, Collection::Student).await,
        (1..=13).collect::<Vec<_>>()
    );
}

/// A file database with a full pool, so writers really run on separate
/// connections and contend for the write lock.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mutations_on_pooled_file_store_stay_dense() {
    let dir = tempfile::tempdir().unwrap();
    let settings = PoolSettings::default();
    assert!(settings.max_connections > 1);

    let store = Arc::new(
        SqliteStore::from_path(dir.path().join("roster.db"), &settings)
            .await
            .unwrap(),
    );
    seed_students(&store, &["A", "B", "C", "D", "E"]).await;

    let tasks: Vec<_> = (0..40)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                if i % 4 == 0 {
                    registry::remove_and_compact(store.as_ref(), Collection::Student, 1)
                        .await
                        .map(drop)
                } else {
                    let payload = Payload::from_pairs(Collection::Student, [("name", "N")]);
                    registry::create(store.as_ref(), &payload).await.map(drop)
                }
            })
        })
        .collect();

    let failures: Vec<String> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .filter_map(|joined| joined.unwrap().err())
        .map(|e| e.to_string())
        .collect();
    assert!(failures.is_empty(), "mutations failed: {:?}", failures);

    // 5 seeded + 30 creates - 10 deletes
    assert_eq!(
        current_ids(&store, Collection::Student).await,
        (1..=25).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_failed_compaction_leaves_collection_untouched() {
    let store = test_store().await;
    seed_students(&store, &["A", "B", "C", "D"]).await;

    // Make the third renumbering step fail.
    sqlx::query(
        r#"
        CREATE TRIGGER fail_on_four BEFORE UPDATE OF id ON student
        WHEN OLD.id = 4
        BEGIN
            SELECT RAISE(ABORT, 'renumbering refused');
        END
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();

    let err = registry::remove_and_compact(store.as_ref(), Collection::Student, 1)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "STORE_UNAVAILABLE");

    // Neither the delete nor the first two updates survived.
    assert_eq!(
        id_name_pairs(&store, Collection::Student).await,
        pairs(&[(1, "A"), (2, "B"), (3, "C"), (4, "D")])
    );
}

#[tokio::test]
async fn test_operations_on_closed_store_fail() {
    let store = test_store().await;
    seed_students(&store, &["A"]).await;
    store.close().await;

    let err = registry::remove_and_compact(store.as_ref(), Collection::Student, 1)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "STORE_UNAVAILABLE");

    let err = registry::assign_next_id(store.as_ref(), Collection::Student)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
}
