// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for roster-core.
//!
//! Removing an id that does not exist is not an error: the delete step simply
//! affects no rows. Everything the store can fail on collapses into
//! [`RosterError::StoreUnavailable`].

use std::fmt;

/// Result type using RosterError
pub type Result<T> = std::result::Result<T, RosterError>;

/// Errors raised by the registry and the store backends.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum RosterError {
    /// The store could not be reached or a query failed.
    StoreUnavailable {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl RosterError {
    /// Build a `StoreUnavailable` error for the given operation.
    pub fn store(operation: &str, details: impl fmt::Display) -> Self {
        Self::StoreUnavailable {
            operation: operation.to_string(),
            details: details.to_string(),
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUnavailable { operation, details } => {
                write!(f, "Store unavailable during '{}': {}", operation, details)
            }
        }
    }
}

impl std::error::Error for RosterError {}

impl From<sqlx::Error> for RosterError {
    fn from(err: sqlx::Error) -> Self {
        RosterError::store("query", err)
    }
}
