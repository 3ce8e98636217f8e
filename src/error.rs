//! Error types crossing the interpreter boundary.
//!
//! Two families live here:
//!
//! - [`AdapterError`]: what a collaborator (database driver, broker
//!   client, ...) reports when the real operation could not be carried out.
//! - [`InterpreterError`]: what the engine reports to the program runner.
//!   Collaborator failures are translated into the category-specific
//!   variant, carrying whether a retry could succeed.
//!
//! Domain outcomes such as "record not found" are *not* errors and never
//! appear here; they travel in the success branch (see
//! [`Lookup`](crate::effect::Lookup)).
//!
//! # Examples
//!
//! ```rust
//! use effectum::effect::{EffectCategory, EffectTag};
//! use effectum::error::{AdapterError, DefectReason, InterpreterError};
//!
//! let error = InterpreterError::from_adapter(
//!     EffectCategory::Persistence,
//!     AdapterError::Timeout("pool exhausted".to_string()),
//! );
//! assert!(error.is_retryable());
//!
//! let defect = InterpreterError::defect(EffectTag::CacheGet, DefectReason::NoHandler);
//! assert!(defect.is_defect());
//! assert!(!defect.is_retryable());
//! ```

use thiserror::Error;

use crate::effect::{EffectCategory, EffectTag};

// =============================================================================
// AdapterError
// =============================================================================

/// Failure reported by an infrastructure collaborator.
///
/// Variants distinguish transient conditions (worth retrying by whoever
/// owns a retry policy) from permanent ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The backend could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The backend did not answer in time.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The backend is temporarily refusing work.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the write as inconsistent with its constraints.
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    /// The backend answered with something that could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The backend refused the request (permissions, unknown resource kind).
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl AdapterError {
    /// Returns `true` for failures that may succeed on a later attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::Unavailable(_)
        )
    }
}

// =============================================================================
// DefectReason
// =============================================================================

/// Why an effect could not be interpreted because of a wiring bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DefectReason {
    /// No interpreter is registered for the effect's category.
    #[error("has no registered interpreter")]
    NoHandler,

    /// The value used to resume the program has the wrong shape.
    #[error("was resumed with {found}, expected {expected}")]
    ReturnMismatch {
        /// Type the program expected to be resumed with.
        expected: &'static str,
        /// Shape of the value that was supplied.
        found: &'static str,
    },
}

// =============================================================================
// InterpreterError
// =============================================================================

/// Failure returned by an interpreter or by the program runner.
///
/// The per-category variants describe infrastructure failures and carry a
/// `retryable` flag. [`InterpreterError::Defect`] signals a programming
/// error (an effect routed nowhere, or resumed with the wrong value) and
/// is never retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    /// The record store could not execute the operation.
    #[error("persistence failure: {message}")]
    Persistence {
        /// Collaborator message.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// The cache could not execute the operation.
    #[error("cache failure: {message}")]
    Cache {
        /// Collaborator message.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// The message broker could not execute the operation.
    #[error("messaging failure: {message}")]
    Messaging {
        /// Collaborator message.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// The object store could not execute the operation.
    #[error("object storage failure: {message}")]
    Storage {
        /// Collaborator message.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// The identity provider could not execute the operation.
    #[error("identity failure: {message}")]
    Identity {
        /// Collaborator message.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// The clinical record system could not execute the operation.
    #[error("healthcare failure: {message}")]
    Healthcare {
        /// Collaborator message.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// The audit trail could not be written before a sensitive effect.
    #[error("audit failure before {effect}: {message}")]
    Audit {
        /// The effect whose audit record failed.
        effect: EffectTag,
        /// Collaborator message.
        message: String,
    },

    /// A wiring bug: the effect was unroutable or resumed incorrectly.
    #[error("defect: effect {effect} {reason}")]
    Defect {
        /// The offending effect.
        effect: EffectTag,
        /// What went wrong.
        reason: DefectReason,
    },
}

impl InterpreterError {
    /// Translates a collaborator failure into the variant for `category`.
    #[must_use]
    pub fn from_adapter(category: EffectCategory, error: AdapterError) -> Self {
        let retryable = error.is_transient();
        let message = error.to_string();
        match category {
            EffectCategory::Persistence => Self::Persistence { message, retryable },
            EffectCategory::Cache => Self::Cache { message, retryable },
            EffectCategory::Messaging => Self::Messaging { message, retryable },
            EffectCategory::Storage => Self::Storage { message, retryable },
            EffectCategory::Identity => Self::Identity { message, retryable },
            EffectCategory::Healthcare => Self::Healthcare { message, retryable },
        }
    }

    /// Creates a defect for `effect`.
    #[must_use]
    pub const fn defect(effect: EffectTag, reason: DefectReason) -> Self {
        Self::Defect { effect, reason }
    }

    /// Creates an audit failure for `effect`.
    #[must_use]
    pub fn audit(effect: EffectTag, error: &AdapterError) -> Self {
        Self::Audit {
            effect,
            message: error.to_string(),
        }
    }

    /// Returns `true` if the failed operation may succeed if attempted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence { retryable, .. }
            | Self::Cache { retryable, .. }
            | Self::Messaging { retryable, .. }
            | Self::Storage { retryable, .. }
            | Self::Identity { retryable, .. }
            | Self::Healthcare { retryable, .. } => *retryable,
            Self::Audit { .. } | Self::Defect { .. } => false,
        }
    }

    /// Returns `true` for the defect variant.
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(self, Self::Defect { .. })
    }

    /// The effect category the failure belongs to, if any.
    #[must_use]
    pub const fn category(&self) -> Option<EffectCategory> {
        match self {
            Self::Persistence { .. } => Some(EffectCategory::Persistence),
            Self::Cache { .. } => Some(EffectCategory::Cache),
            Self::Messaging { .. } => Some(EffectCategory::Messaging),
            Self::Storage { .. } => Some(EffectCategory::Storage),
            Self::Identity { .. } => Some(EffectCategory::Identity),
            Self::Healthcare { .. } => Some(EffectCategory::Healthcare),
            Self::Audit { .. } | Self::Defect { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AdapterError::Connection("refused".into()), true)]
    #[case(AdapterError::Timeout("30s".into()), true)]
    #[case(AdapterError::Unavailable("503".into()), true)]
    #[case(AdapterError::ConstraintViolation("unique".into()), false)]
    #[case(AdapterError::Malformed("bad json".into()), false)]
    #[case(AdapterError::Rejected("forbidden".into()), false)]
    fn adapter_error_transience(#[case] error: AdapterError, #[case] transient: bool) {
        assert_eq!(error.is_transient(), transient);
    }

    #[rstest]
    #[case(EffectCategory::Persistence)]
    #[case(EffectCategory::Cache)]
    #[case(EffectCategory::Messaging)]
    #[case(EffectCategory::Storage)]
    #[case(EffectCategory::Identity)]
    #[case(EffectCategory::Healthcare)]
    fn from_adapter_maps_to_category_variant(#[case] category: EffectCategory) {
        let error = InterpreterError::from_adapter(category, AdapterError::Timeout("t".into()));
        assert_eq!(error.category(), Some(category));
        assert!(error.is_retryable());
    }

    #[rstest]
    fn constraint_violation_is_not_retryable() {
        let error = InterpreterError::from_adapter(
            EffectCategory::Persistence,
            AdapterError::ConstraintViolation("duplicate key".into()),
        );
        assert!(!error.is_retryable());
        assert_eq!(
            error.to_string(),
            "persistence failure: constraint violated: duplicate key"
        );
    }

    #[rstest]
    fn defect_is_never_retryable() {
        let error = InterpreterError::defect(EffectTag::GetRecord, DefectReason::NoHandler);
        assert!(error.is_defect());
        assert!(!error.is_retryable());
        assert_eq!(error.category(), None);
        assert_eq!(
            error.to_string(),
            "defect: effect get_record has no registered interpreter"
        );
    }

    #[rstest]
    fn return_mismatch_display() {
        let reason = DefectReason::ReturnMismatch {
            expected: "bool",
            found: "unit",
        };
        assert_eq!(reason.to_string(), "was resumed with unit, expected bool");
    }

    #[rstest]
    fn audit_failure_mentions_effect() {
        let error = InterpreterError::audit(
            EffectTag::GetPatient,
            &AdapterError::Unavailable("audit store".into()),
        );
        assert!(!error.is_retryable());
        assert_eq!(
            error.to_string(),
            "audit failure before get_patient: backend unavailable: audit store"
        );
    }
}
