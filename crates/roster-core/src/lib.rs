// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Roster Core - Sequential Id Registry
//!
//! This crate owns the identifier policy for roster collections. Every
//! collection (`student`, `teacher`) keeps its ids dense: a collection of
//! size N holds exactly the ids `1..=N`. New entities get `max(id) + 1`, and
//! removing an entity renumbers the rows above it so no gap remains.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         roster-server (axum)                            │
//! │        /api/student  /api/addstudent  /api/student/{id}  /readyz        │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      registry (this crate)                              │
//! │          assign_next_id · create · remove_and_compact · list            │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │ &dyn Store
//!                                    ▼
//! ┌───────────────────────┐                    ┌─────────────────────────────┐
//! │    PostgresStore      │                    │        SqliteStore          │
//! │  (LOCK TABLE per tx)  │                    │ (embedded / in-memory)      │
//! └───────────────────────┘                    └─────────────────────────────┘
//! ```
//!
//! # Registry Operations
//!
//! | Operation | Atomic | Description |
//! |-----------|--------|-------------|
//! | `assign_next_id` | No | Read `max(id)` and return `max + 1` |
//! | `create` | Yes | Assign the next id and insert in one transaction |
//! | `remove_and_compact` | Yes | Delete a row, then renumber the rest to `1..=N` |
//! | `list` | - | Read all rows ordered by id |
//!
//! `assign_next_id` on its own is a plain read: two callers racing against
//! the same collection can both receive the same id. The `create` and
//! `remove_and_compact` paths take a collection-scoped write lock inside a
//! store transaction, so they never interleave with each other and a failure
//! mid-compaction rolls back instead of leaving a half-renumbered collection.
//!
//! # Modules
//!
//! - [`collection`]: Collection names, payload mapping and entity rows
//! - [`error`]: Error type shared by the registry and the stores
//! - [`persistence`]: Store abstraction with PostgreSQL and SQLite backends
//! - [`registry`]: Id assignment and compaction

#![deny(missing_docs)]

/// Collections, their payload columns and entity rows.
pub mod collection;

/// Error types for registry and store operations.
pub mod error;

/// Store abstraction and its PostgreSQL/SQLite backends.
pub mod persistence;

/// Dense sequential id assignment and compaction.
pub mod registry;

pub use collection::{Collection, Entity, Payload};
pub use error::{Result, RosterError};
pub use persistence::{PoolSettings, PostgresStore, SqliteStore, Store, StoreTx};
