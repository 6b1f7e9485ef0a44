// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed store implementation.
//!
//! Mutation transactions start with `LOCK TABLE ... IN SHARE ROW EXCLUSIVE
//! MODE`. That mode conflicts with itself, so two writers on the same
//! collection queue up behind each other, while plain `SELECT`s from list
//! endpoints and readiness checks keep running.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::collection::{Collection, Entity, Payload};
use crate::error::{Result, RosterError};

use super::sql::{self, Dialect};
use super::{PoolSettings, Store, StoreTx};

const DIALECT: Dialect = Dialect::Postgres;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new Postgres-backed store from an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using a `postgres://` URL.
    pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Self> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e| RosterError::store("connect", format!("Invalid PostgreSQL URL: {}", e)))?;
        Self::connect_with(options, settings).await
    }

    /// Connect using prepared connect options.
    pub async fn connect_with(options: PgConnectOptions, settings: &PoolSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                RosterError::store("connect", format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        Ok(Self { pool })
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn entity_from_row(collection: Collection, row: &PgRow) -> Result<Entity> {
    let id: i64 = row.try_get("id")?;
    let mut fields = std::collections::BTreeMap::new();
    for field in collection.fields() {
        let value: Option<String> = row.try_get(field.column)?;
        fields.insert(field.column.to_string(), value);
    }
    Ok(Entity { id, fields })
}

#[async_trait]
impl Store for PostgresStore {
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
            "LOCK TABLE \"{}\" IN SHARE ROW EXCLUSIVE MODE",
            collection.table()
        ))
        .execute(&mut *tx)
        .await?;

        debug!(collection = %collection, "Collection lock acquired");
        Ok(Box::new(PostgresTx { collection, tx }))
    }

    async fn ping(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
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

struct PostgresTx {
    collection: Collection,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresTx {
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
