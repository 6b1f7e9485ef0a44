// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed store implementation.
//!
//! SQLite locks the whole database, not a table. `begin` issues a no-op
//! `UPDATE` so the transaction takes the write lock up front instead of on
//! its first real write; a second writer then waits on the busy timeout
//! rather than failing halfway through a compaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::collection::{Collection, Entity, Payload};
use crate::error::{Result, RosterError};

use super::sql::{self, Dialect};
use super::{PoolSettings, Store, StoreTx};

const DIALECT: Dialect = Dialect::Sqlite;

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using a `sqlite:` URL.
    ///
    /// In-memory databases are private to a connection, so a `:memory:` URL
    /// is always opened with a single, never-recycled connection.
    pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| RosterError::store("connect", format!("Invalid SQLite URL: {}", e)))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout);
        if url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            RosterError::store("connect", format!("Failed to connect to SQLite at {}: {}", url, e))
        })?;

        Ok(Self { pool })
    }

    /// Open a private in-memory database with the schema already created.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::connect("sqlite::memory:", &PoolSettings::default()).await?;
        store.bootstrap_schema().await?;
        Ok(store)
    }

    /// Create and initialize a new SQLite store from a file path.
    ///
    /// Creates parent directories and the database file if needed, then
    /// bootstraps the collection tables.
    pub async fn from_path(path: impl AsRef<Path>, settings: &PoolSettings) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                RosterError::store(
                    "create_dir",
                    format!("Failed to create directory {:?}: {}", parent, e),
                )
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        let store = Self::connect(&url, settings).await?;
        store.bootstrap_schema().await?;

        Ok(store)
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn entity_from_row(collection: Collection, row: &SqliteRow) -> Result<Entity> {
    let id: i64 = row.try_get("id")?;
    let mut fields = BTreeMap::new();
    for field in collection.fields() {
        let value: Option<String> = row.try_get(field.column)?;
        fields.insert(field.column.to_string(), value);
    }
    Ok(Entity { id, fields })
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_rows(&self, collection: Collection) -> Result<Vec<Entity>> {
        let rows = sqlx::query(&sql::select_rows(collection, DIALECT))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| entity_from_row(collection, row))
            .collect()
    }

    async fn max_id(&self, collection: Collection) -> Result<i64> {
        let max = sqlx::query_scalar::<_, i64>(&sql::select_max_id(collection, DIALECT))
            .fetch_one(&self.pool)
            .await?;

        Ok(max)
    }

    async fn begin(&self, collection: Collection) -> Result<Box<dyn StoreTx>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "UPDATE \"{}\" SET id = id WHERE 1 = 0",
            collection.table()
        ))
        .execute(&mut *tx)
        .await?;

        debug!(collection = %collection, "Write lock acquired");
        Ok(Box::new(SqliteTx { collection, tx }))
    }

    async fn ping(&self) -> Result<()> {
        let _: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn bootstrap_schema(&self) -> Result<()> {
        for collection in Collection::ALL {
            sqlx::query(&sql::create_table(collection))
                .execute(&self.pool)
                .await
                .map_err(|e| RosterError::store("bootstrap_schema", e))?;
        }
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct SqliteTx {
    collection: Collection,
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn max_id(&mut self) -> Result<i64> {
        let max = sqlx::query_scalar::<_, i64>(&sql::select_max_id(self.collection, DIALECT))
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(max)
    }

    async fn list_ids(&mut self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(&sql::select_ids(self.collection, DIALECT))
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(ids)
    }

    async fn insert_row(&mut self, id: i64, payload: &Payload) -> Result<()> {
        debug_assert_eq!(payload.collection(), self.collection);

        let statement = sql::insert_row(self.collection, DIALECT);
        let mut query = sqlx::query(&statement).bind(id);
        for value in payload.values() {
            query = query.bind(value.as_deref());
        }
        query.execute(&mut *self.tx).await?;

        Ok(())
    }

    async fn delete_row(&mut self, id: i64) -> Result<u64> {
        let result = sqlx::query(&sql::delete_row(self.collection, DIALECT))
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn update_row_id(&mut self, old_id: i64, new_id: i64) -> Result<u64> {
        let result = sqlx::query(&sql::update_row_id(self.collection, DIALECT))
            .bind(new_id)
            .bind(old_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
