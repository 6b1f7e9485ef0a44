// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Store interfaces and backends for roster-core.
//!
//! A [`Store`] is the pooled handle shared by all requests. Reads go straight
//! to the pool. Mutations go through a [`StoreTx`], which holds one connection
//! inside a transaction and owns the collection's write lock until it is
//! committed or dropped. Dropping a `StoreTx` without committing rolls back.

pub mod postgres;
mod sql;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::collection::{Collection, Entity, Payload};
use crate::error::{Result, RosterError};

/// Connection pool sizing shared by every backend.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long to wait for a free connection before failing.
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Store interface used by the registry and the HTTP layer.
#[async_trait]
pub trait Store: Send + Sync {
    /// Every row in the collection, ordered by id.
    async fn list_rows(&self, collection: Collection) -> Result<Vec<Entity>>;

    /// Largest id in the collection, 0 when empty.
    async fn max_id(&self, collection: Collection) -> Result<i64>;

    /// Open a transaction holding the collection's write lock.
    async fn begin(&self, collection: Collection) -> Result<Box<dyn StoreTx>>;

    /// Lightweight round-trip used by readiness checks and startup checks.
    async fn ping(&self) -> Result<()>;

    /// Create the collection tables if they do not exist yet.
    async fn bootstrap_schema(&self) -> Result<()>;

    /// Close the pool, waiting for checked-out connections to return.
    async fn close(&self);
}

/// A single-collection transaction.
#[async_trait]
pub trait StoreTx: Send {
    /// Largest id in the collection, 0 when empty.
    async fn max_id(&mut self) -> Result<i64>;

    /// Every id in the collection, ascending.
    async fn list_ids(&mut self) -> Result<Vec<i64>>;

    /// Insert a row under an explicit id.
    async fn insert_row(&mut self, id: i64, payload: &Payload) -> Result<()>;

    /// Delete a row by id, returning the number of rows removed.
    async fn delete_row(&mut self, id: i64) -> Result<u64>;

    /// Move a row from `old_id` to `new_id`, returning rows affected.
    async fn update_row_id(&mut self, old_id: i64, new_id: i64) -> Result<u64>;

    /// Commit and release the lock.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Connect to a store by URL.
///
/// `sqlite:` URLs open a [`SqliteStore`]; `postgres://` and `postgresql://`
/// URLs open a [`PostgresStore`].
pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Arc<dyn Store>> {
    if url.starts_with("sqlite:") {
        let store = SqliteStore::connect(url, settings).await?;
        Ok(Arc::new(store))
    } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PostgresStore::connect(url, settings).await?;
        Ok(Arc::new(store))
    } else {
        Err(RosterError::store(
            "connect",
            "unsupported database URL scheme (expected postgres:// or sqlite:)",
        ))
    }
}
