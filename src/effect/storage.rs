//! Object storage effects.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{EffectCategory, EffectTag, Operation};
use crate::program::Program;

/// Bucket and key of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    /// Bucket name.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
}

impl ObjectLocation {
    /// Creates a location.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.bucket, self.key)
    }
}

/// An object together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Where the object lives.
    pub location: ObjectLocation,
    /// MIME type.
    pub content_type: String,
    /// Object content.
    pub bytes: Vec<u8>,
}

/// Operations against the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEffect {
    /// Write an object; resumes with `()`.
    PutObject {
        /// The object.
        object: StoredObject,
    },
    /// Read an object; resumes with `Option<StoredObject>`.
    GetObject {
        /// Where to read.
        location: ObjectLocation,
    },
    /// Remove an object; resumes with `()`.
    DeleteObject {
        /// What to remove.
        location: ObjectLocation,
    },
    /// List keys under a prefix; resumes with `Vec<String>`.
    ListObjects {
        /// Bucket to list.
        bucket: String,
        /// Key prefix filter.
        prefix: String,
    },
}

impl Operation for StorageEffect {
    const CATEGORY: EffectCategory = EffectCategory::Storage;

    fn tag(&self) -> EffectTag {
        match self {
            Self::PutObject { .. } => EffectTag::PutObject,
            Self::GetObject { .. } => EffectTag::GetObject,
            Self::DeleteObject { .. } => EffectTag::DeleteObject,
            Self::ListObjects { .. } => EffectTag::ListObjects,
        }
    }

    fn resource_id(&self) -> Option<String> {
        match self {
            Self::PutObject { object } => Some(object.location.to_string()),
            Self::GetObject { location } | Self::DeleteObject { location } => {
                Some(location.to_string())
            }
            Self::ListObjects { bucket, prefix } => Some(format!("{bucket}/{prefix}")),
        }
    }
}

/// Yields [`StorageEffect::PutObject`].
#[must_use]
pub fn put_object(object: StoredObject) -> Program<()> {
    Program::perform(StorageEffect::PutObject { object })
}

/// Yields [`StorageEffect::GetObject`].
#[must_use]
pub fn get_object(location: ObjectLocation) -> Program<Option<StoredObject>> {
    Program::perform(StorageEffect::GetObject { location })
}

/// Yields [`StorageEffect::DeleteObject`].
#[must_use]
pub fn delete_object(location: ObjectLocation) -> Program<()> {
    Program::perform(StorageEffect::DeleteObject { location })
}

/// Yields [`StorageEffect::ListObjects`].
#[must_use]
pub fn list_objects(bucket: impl Into<String>, prefix: impl Into<String>) -> Program<Vec<String>> {
    Program::perform(StorageEffect::ListObjects {
        bucket: bucket.into(),
        prefix: prefix.into(),
    })
}
