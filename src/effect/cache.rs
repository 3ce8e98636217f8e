//! Cache effects.

use std::time::Duration;

use super::{EffectCategory, EffectTag, Operation};
use crate::program::Program;

/// Operations against the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEffect {
    /// Read a key; resumes with `Option<serde_json::Value>`.
    Get {
        /// Key to read.
        key: String,
    },
    /// Write a key with a time to live; resumes with `()`.
    Put {
        /// Key to write.
        key: String,
        /// Value to store.
        value: serde_json::Value,
        /// How long the entry stays valid.
        time_to_live: Duration,
    },
    /// Drop a key; resumes with `()`.
    Invalidate {
        /// Key to drop.
        key: String,
    },
}

impl Operation for CacheEffect {
    const CATEGORY: EffectCategory = EffectCategory::Cache;

    fn tag(&self) -> EffectTag {
        match self {
            Self::Get { .. } => EffectTag::CacheGet,
            Self::Put { .. } => EffectTag::CachePut,
            Self::Invalidate { .. } => EffectTag::CacheInvalidate,
        }
    }

    fn resource_id(&self) -> Option<String> {
        match self {
            Self::Get { key } | Self::Put { key, .. } | Self::Invalidate { key } => {
                Some(key.clone())
            }
        }
    }
}

/// Yields [`CacheEffect::Get`].
#[must_use]
pub fn get(key: impl Into<String>) -> Program<Option<serde_json::Value>> {
    Program::perform(CacheEffect::Get { key: key.into() })
}

/// Yields [`CacheEffect::Put`].
#[must_use]
pub fn put(key: impl Into<String>, value: serde_json::Value, time_to_live: Duration) -> Program<()> {
    Program::perform(CacheEffect::Put {
        key: key.into(),
        value,
        time_to_live,
    })
}

/// Yields [`CacheEffect::Invalidate`].
#[must_use]
pub fn invalidate(key: impl Into<String>) -> Program<()> {
    Program::perform(CacheEffect::Invalidate { key: key.into() })
}
