// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Collections and the opaque payload they carry.
//!
//! The registry only ever looks at `id`. Everything else in a row is payload:
//! it is copied from the request body into the table and back out again
//! without validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A payload field: the key it arrives under in a request body and the
/// column it is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// JSON key in create request bodies.
    pub key: &'static str,
    /// Column name in the collection table.
    pub column: &'static str,
}

const STUDENT_FIELDS: &[Field] = &[
    Field {
        key: "name",
        column: "name",
    },
    Field {
        key: "rollNo",
        column: "roll_number",
    },
    Field {
        key: "class",
        column: "class",
    },
];

const TEACHER_FIELDS: &[Field] = &[
    Field {
        key: "name",
        column: "name",
    },
    Field {
        key: "subject",
        column: "subject",
    },
    Field {
        key: "class",
        column: "class",
    },
];

/// A named set of entities sharing one id namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Student records (`student` table).
    Student,
    /// Teacher records (`teacher` table).
    Teacher,
}

impl Collection {
    /// Every known collection.
    pub const ALL: [Collection; 2] = [Collection::Student, Collection::Teacher];

    /// Lowercase collection name, also used as the table name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }

    /// Capitalized name for user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Teacher => "Teacher",
        }
    }

    /// Table backing this collection.
    pub fn table(self) -> &'static str {
        self.name()
    }

    /// Payload fields in column order.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Self::Student => STUDENT_FIELDS,
            Self::Teacher => TEACHER_FIELDS,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload values for one new entity, aligned with [`Collection::fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    collection: Collection,
    values: Vec<Option<String>>,
}

impl Payload {
    /// Pick the collection's fields out of a request body.
    ///
    /// No validation happens here. Strings are kept verbatim, other scalars
    /// and nested values are stored in their JSON text form, and missing or
    /// `null` fields become NULL. A body that is not an object yields an
    /// all-NULL payload.
    pub fn from_json(collection: Collection, body: &Value) -> Self {
        let values = collection
            .fields()
            .iter()
            .map(|field| body.get(field.key).and_then(opaque_text))
            .collect();

        Self { collection, values }
    }

    /// Build a payload from `(key, value)` pairs; unknown keys are ignored.
    pub fn from_pairs<'a>(
        collection: Collection,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut values = vec![None; collection.fields().len()];
        for (key, value) in pairs {
            if let Some(idx) = collection.fields().iter().position(|f| f.key == key) {
                values[idx] = Some(value.to_string());
            }
        }

        Self { collection, values }
    }

    /// Collection this payload was built for.
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Values in column order.
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }
}

fn opaque_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A stored row: its id plus payload columns keyed by column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Dense 1-based id within the collection.
    pub id: i64,
    /// Payload columns.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Option<String>>,
}

impl Entity {
    /// Value of a payload column, if present and not NULL.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(|v| v.as_deref())
    }
}
