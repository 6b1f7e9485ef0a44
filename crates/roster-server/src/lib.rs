// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Roster Server - HTTP API over the roster registry
//!
//! Serves the student and teacher collections over HTTP:
//! - `GET /api/{collection}` lists rows ordered by id
//! - `POST /api/add{collection}` creates a row under the next dense id
//! - `DELETE /api/{collection}/{id}` removes a row and compacts the rest
//! - `GET /healthz` and `GET /readyz` for liveness and readiness checks

pub mod api;
pub mod config;

pub use api::{AppState, build_router};
pub use config::{Config, ConfigError, DatabaseConfig};
