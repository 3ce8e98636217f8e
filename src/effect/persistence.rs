//! Record repository effects.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{EffectCategory, EffectTag, Lookup, Operation};
use crate::program::Program;

/// Identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// A schemaless record as the repository stores it.
///
/// The encoding of `data` on disk is the repository's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier, unique within its collection.
    pub id: RecordId,
    /// Logical collection (table, bucket of documents...).
    pub collection: String,
    /// Record payload.
    pub data: serde_json::Value,
}

impl Record {
    /// Creates a record.
    #[must_use]
    pub fn new(id: RecordId, collection: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id,
            collection: collection.into(),
            data,
        }
    }
}

/// Operations against the record repository.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceEffect {
    /// Fetch one record; resumes with `Lookup<Record>`.
    GetRecord {
        /// Record to fetch.
        id: RecordId,
    },
    /// Insert or replace a record; resumes with `()`.
    SaveRecord {
        /// Record to write.
        record: Record,
    },
    /// Remove a record; resumes with `()`.
    DeleteRecord {
        /// Record to remove.
        id: RecordId,
    },
    /// List a collection; resumes with `Vec<Record>`.
    ListRecords {
        /// Collection to list.
        collection: String,
    },
}

impl Operation for PersistenceEffect {
    const CATEGORY: EffectCategory = EffectCategory::Persistence;

    fn tag(&self) -> EffectTag {
        match self {
            Self::GetRecord { .. } => EffectTag::GetRecord,
            Self::SaveRecord { .. } => EffectTag::SaveRecord,
            Self::DeleteRecord { .. } => EffectTag::DeleteRecord,
            Self::ListRecords { .. } => EffectTag::ListRecords,
        }
    }

    fn resource_id(&self) -> Option<String> {
        match self {
            Self::GetRecord { id } | Self::DeleteRecord { id } => Some(id.to_string()),
            Self::SaveRecord { record } => Some(record.id.to_string()),
            Self::ListRecords { collection } => Some(collection.clone()),
        }
    }
}

/// Yields [`PersistenceEffect::GetRecord`].
#[must_use]
pub fn get_record(id: RecordId) -> Program<Lookup<Record>> {
    Program::perform(PersistenceEffect::GetRecord { id })
}

/// Yields [`PersistenceEffect::SaveRecord`].
#[must_use]
pub fn save_record(record: Record) -> Program<()> {
    Program::perform(PersistenceEffect::SaveRecord { record })
}

/// Yields [`PersistenceEffect::DeleteRecord`].
#[must_use]
pub fn delete_record(id: RecordId) -> Program<()> {
    Program::perform(PersistenceEffect::DeleteRecord { id })
}

/// Yields [`PersistenceEffect::ListRecords`].
#[must_use]
pub fn list_records(collection: impl Into<String>) -> Program<Vec<Record>> {
    Program::perform(PersistenceEffect::ListRecords {
        collection: collection.into(),
    })
}
