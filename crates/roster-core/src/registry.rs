// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dense sequential id assignment.
//!
//! A collection of N rows always holds the ids `1..=N`. New rows take
//! `max + 1`; removing a row shifts every row above it down by one. Ids are
//! therefore positions, not stable references: a client holding id 7 from
//! an earlier listing will address a different row after any delete below 7.
//!
//! All operations take the store handle explicitly and keep no state of
//! their own.

use tracing::{debug, info, instrument};

use crate::collection::{Collection, Entity, Payload};
use crate::error::Result;
use crate::persistence::Store;

/// One row's move during compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renumbering {
    /// Id before compaction.
    pub from: i64,
    /// Id after compaction (the row's 1-based rank).
    pub to: i64,
}

/// What a [`remove_and_compact`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionReport {
    /// Whether a row with the requested id existed and was deleted.
    pub removed: bool,
    /// Rows left in the collection.
    pub remaining: usize,
    /// Rows whose id changed, in the order they were updated.
    pub renumbered: Vec<Renumbering>,
}

/// The id that follows `max_id` (0 for an empty collection).
pub fn next_id_after(max_id: i64) -> i64 {
    max_id + 1
}

/// Map a snapshot of ascending ids onto `1..=N`.
///
/// Only rows whose id actually changes are returned, in ascending order.
/// Applying them in that order never collides: each target rank is below the
/// row's current id and every smaller id already belongs to a row that has
/// been placed.
pub fn compaction_plan(ids: &[i64]) -> Vec<Renumbering> {
    debug_assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids must be ascending");

    let mut plan = Vec::new();
    for (from, to) in ids.iter().copied().zip(1_i64..) {
        if from != to {
            plan.push(Renumbering { from, to });
        }
    }
    plan
}

/// Read the collection's largest id and return the next one.
///
/// This is a plain read. Nothing stops a second caller from getting the same
/// answer before either of them inserts; use [`create`] when the id is going
/// to be inserted.
#[instrument(skip(store, collection), fields(collection = %collection))]
pub async fn assign_next_id(store: &dyn Store, collection: Collection) -> Result<i64> {
    let max_id = store.max_id(collection).await?;
    let next = next_id_after(max_id);
    debug!(max_id, next, "Next id assigned");
    Ok(next)
}

/// Insert a new entity under the next id, returning that id.
///
/// The max-id read and the insert share one transaction holding the
/// collection write lock, so concurrent creates get distinct ids.
#[instrument(skip(store, payload), fields(collection = %payload.collection()))]
pub async fn create(store: &dyn Store, payload: &Payload) -> Result<i64> {
    let mut tx = store.begin(payload.collection()).await?;

    let id = next_id_after(tx.max_id().await?);
    tx.insert_row(id, payload).await?;
    tx.commit().await?;

    info!(id, "Entity created");
    Ok(id)
}

/// Delete the row with `id` and renumber the remaining rows to `1..=N`.
///
/// Deleting an id that does not exist is not an error. The delete, the id
/// snapshot and every update run in one transaction; if any step fails the
/// collection is left exactly as it was.
#[instrument(skip(store, collection), fields(collection = %collection))]
pub async fn remove_and_compact(
    store: &dyn Store,
    collection: Collection,
    id: i64,
) -> Result<CompactionReport> {
    let mut tx = store.begin(collection).await?;

    let removed = tx.delete_row(id).await? > 0;
    let ids = tx.list_ids().await?;
    let plan = compaction_plan(&ids);

    for step in &plan {
        tx.update_row_id(step.from, step.to).await?;
    }
    tx.commit().await?;

    if removed {
        info!(
            remaining = ids.len(),
            renumbered = plan.len(),
            "Entity removed and collection compacted"
        );
    } else {
        debug!(remaining = ids.len(), "No row with that id; nothing removed");
    }

    Ok(CompactionReport {
        removed,
        remaining: ids.len(),
        renumbered: plan,
    })
}

/// Every entity in the collection, ordered by id.
#[instrument(skip(store, collection), fields(collection = %collection))]
pub async fn list(store: &dyn Store, collection: Collection) -> Result<Vec<Entity>> {
    store.list_rows(collection).await
}
