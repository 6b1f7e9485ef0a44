// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQL text shared by the backends.
//!
//! Table and column names come from [`Collection`], never from user input, so
//! they are spliced in directly. All values are bound.

use crate::collection::Collection;

/// SQL flavor of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    /// `$1, $2, ...` placeholders. Read columns are cast to the decoded types
    /// so tables created outside the bootstrap (`INTEGER` ids, `VARCHAR`
    /// payload) still decode.
    Postgres,
    /// `?, ?, ...` placeholders, no casts.
    Sqlite,
}

impl Dialect {
    fn nth(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${}", n),
            Self::Sqlite => "?".to_string(),
        }
    }

    fn id(self) -> &'static str {
        match self {
            Self::Postgres => "id::BIGINT AS id",
            Self::Sqlite => "id",
        }
    }

    fn text_column(self, column: &str) -> String {
        match self {
            Self::Postgres => format!("\"{0}\"::TEXT AS \"{0}\"", column),
            Self::Sqlite => format!("\"{}\"", column),
        }
    }

    fn max_id(self) -> &'static str {
        match self {
            Self::Postgres => "COALESCE(MAX(id), 0)::BIGINT",
            Self::Sqlite => "COALESCE(MAX(id), 0)",
        }
    }
}

pub(crate) fn select_rows(collection: Collection, dialect: Dialect) -> String {
    let columns: Vec<String> = collection
        .fields()
        .iter()
        .map(|f| dialect.text_column(f.column))
        .collect();
    format!(
        "SELECT {}, {} FROM \"{}\" ORDER BY id",
        dialect.id(),
        columns.join(", "),
        collection.table()
    )
}

pub(crate) fn select_ids(collection: Collection, dialect: Dialect) -> String {
    format!(
        "SELECT {} FROM \"{}\" ORDER BY id",
        dialect.id(),
        collection.table()
    )
}

pub(crate) fn select_max_id(collection: Collection, dialect: Dialect) -> String {
    format!(
        "SELECT {} FROM \"{}\"",
        dialect.max_id(),
        collection.table()
    )
}

pub(crate) fn insert_row(collection: Collection, dialect: Dialect) -> String {
    let fields = collection.fields();
    let columns: Vec<String> = fields
        .iter()
        .map(|f| format!("\"{}\"", f.column))
        .collect();
    let params: Vec<String> = (1..=fields.len() + 1).map(|n| dialect.nth(n)).collect();
    format!(
        "INSERT INTO \"{}\" (id, {}) VALUES ({})",
        collection.table(),
        columns.join(", "),
        params.join(", ")
    )
}

pub(crate) fn delete_row(collection: Collection, dialect: Dialect) -> String {
    format!(
        "DELETE FROM \"{}\" WHERE id = {}",
        collection.table(),
        dialect.nth(1)
    )
}

pub(crate) fn update_row_id(collection: Collection, dialect: Dialect) -> String {
    format!(
        "UPDATE \"{}\" SET id = {} WHERE id = {}",
        collection.table(),
        dialect.nth(1),
        dialect.nth(2)
    )
}

pub(crate) fn create_table(collection: Collection) -> String {
    let columns: Vec<String> = collection
        .fields()
        .iter()
        .map(|f| format!("\"{}\" TEXT", f.column))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (id BIGINT NOT NULL PRIMARY KEY, {})",
        collection.table(),
        columns.join(", ")
    )
}
