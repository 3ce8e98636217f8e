//! Effect descriptions: immutable data naming an intended operation.
//!
//! A program never performs I/O itself. At each suspension point it yields
//! an [`Effect`], a closed, exhaustively tagged value carrying only the
//! fields that operation needs. The composite interpreter consumes each
//! effect exactly once and resumes the program with an [`EffectValue`].
//!
//! # Categories
//!
//! Effects are grouped by the collaborator that executes them:
//!
//! | Category | Enum | Collaborator |
//! |---|---|---|
//! | persistence | [`PersistenceEffect`] | `RecordRepository` |
//! | cache | [`CacheEffect`] | `Cache` |
//! | messaging | [`MessagingEffect`] | `MessageBroker` |
//! | storage | [`StorageEffect`] | `ObjectStore` |
//! | identity | [`IdentityEffect`] | `TokenProvider`, `PasswordHasher` |
//! | healthcare | [`HealthcareEffect`] | `ClinicalRecords` |
//!
//! The category of every effect is fixed when the type is defined (the
//! [`Operation::CATEGORY`] constant), and whether it touches regulated data
//! is fixed per operation ([`EffectTag::is_sensitive`]). Neither is ever
//! derived from names at runtime.
//!
//! # Examples
//!
//! ```rust
//! use effectum::effect::{Effect, EffectCategory, PersistenceEffect, RecordId};
//!
//! let effect = Effect::from(PersistenceEffect::GetRecord {
//!     id: RecordId::new("invoice-7"),
//! });
//! assert_eq!(effect.category(), EffectCategory::Persistence);
//! assert_eq!(effect.resource_id().as_deref(), Some("invoice-7"));
//! assert!(!effect.is_sensitive());
//! ```

pub mod cache;
pub mod healthcare;
pub mod identity;
pub mod messaging;
pub mod persistence;
pub mod storage;
mod value;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use cache::CacheEffect;
pub use healthcare::HealthcareEffect;
pub use identity::{
    Claims, IdentityEffect, Password, PasswordHash, Token, TokenPair, TokenValidation,
};
pub use messaging::{Delivery, MessageId, MessagingEffect, OutboundMessage, ReceiptHandle};
pub use persistence::{PersistenceEffect, Record, RecordId};
pub use storage::{ObjectLocation, StorageEffect, StoredObject};
pub use value::{EffectReturn, EffectValue};

// =============================================================================
// EffectCategory
// =============================================================================

/// The collaborator family an effect belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCategory {
    /// Record repository operations.
    Persistence,
    /// Cache operations.
    Cache,
    /// Message broker operations.
    Messaging,
    /// Object storage operations.
    Storage,
    /// Token and password operations.
    Identity,
    /// Clinical record operations.
    Healthcare,
}

impl EffectCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Persistence,
        Self::Cache,
        Self::Messaging,
        Self::Storage,
        Self::Identity,
        Self::Healthcare,
    ];

    /// Stable lowercase name, used as a log field and metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Persistence => "persistence",
            Self::Cache => "cache",
            Self::Messaging => "messaging",
            Self::Storage => "storage",
            Self::Identity => "identity",
            Self::Healthcare => "healthcare",
        }
    }
}

impl fmt::Display for EffectCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// =============================================================================
// EffectTag
// =============================================================================

/// Payload-free identifier of a single effect operation.
///
/// Tags are what gets logged, audited, counted and traced; the effect's
/// payload never leaves the interpreter layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum EffectTag {
    GetRecord,
    SaveRecord,
    DeleteRecord,
    ListRecords,
    CacheGet,
    CachePut,
    CacheInvalidate,
    Publish,
    Consume,
    Acknowledge,
    NegativeAcknowledge,
    PutObject,
    GetObject,
    DeleteObject,
    ListObjects,
    ValidateToken,
    GenerateToken,
    RefreshToken,
    RevokeToken,
    HashPassword,
    VerifyPassword,
    GetPatient,
    GetAppointment,
    SaveAppointment,
    CheckInteractions,
}

impl EffectTag {
    /// The category that owns this operation.
    #[must_use]
    pub const fn category(self) -> EffectCategory {
        match self {
            Self::GetRecord | Self::SaveRecord | Self::DeleteRecord | Self::ListRecords => {
                EffectCategory::Persistence
            }
            Self::CacheGet | Self::CachePut | Self::CacheInvalidate => EffectCategory::Cache,
            Self::Publish | Self::Consume | Self::Acknowledge | Self::NegativeAcknowledge => {
                EffectCategory::Messaging
            }
            Self::PutObject | Self::GetObject | Self::DeleteObject | Self::ListObjects => {
                EffectCategory::Storage
            }
            Self::ValidateToken
            | Self::GenerateToken
            | Self::RefreshToken
            | Self::RevokeToken
            | Self::HashPassword
            | Self::VerifyPassword => EffectCategory::Identity,
            Self::GetPatient
            | Self::GetAppointment
            | Self::SaveAppointment
            | Self::CheckInteractions => EffectCategory::Healthcare,
        }
    }

    /// Whether the operation reads or writes regulated data (PHI).
    ///
    /// Sensitive effects are audited before they are dispatched.
    #[must_use]
    pub const fn is_sensitive(self) -> bool {
        matches!(
            self,
            Self::GetPatient | Self::GetAppointment | Self::SaveAppointment | Self::CheckInteractions
        )
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetRecord => "get_record",
            Self::SaveRecord => "save_record",
            Self::DeleteRecord => "delete_record",
            Self::ListRecords => "list_records",
            Self::CacheGet => "cache_get",
            Self::CachePut => "cache_put",
            Self::CacheInvalidate => "cache_invalidate",
            Self::Publish => "publish",
            Self::Consume => "consume",
            Self::Acknowledge => "acknowledge",
            Self::NegativeAcknowledge => "negative_acknowledge",
            Self::PutObject => "put_object",
            Self::GetObject => "get_object",
            Self::DeleteObject => "delete_object",
            Self::ListObjects => "list_objects",
            Self::ValidateToken => "validate_token",
            Self::GenerateToken => "generate_token",
            Self::RefreshToken => "refresh_token",
            Self::RevokeToken => "revoke_token",
            Self::HashPassword => "hash_password",
            Self::VerifyPassword => "verify_password",
            Self::GetPatient => "get_patient",
            Self::GetAppointment => "get_appointment",
            Self::SaveAppointment => "save_appointment",
            Self::CheckInteractions => "check_interactions",
        }
    }
}

impl fmt::Display for EffectTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// =============================================================================
// Operation
// =============================================================================

/// Static classification shared by every category enum.
pub trait Operation {
    /// The category every variant of this type belongs to.
    const CATEGORY: EffectCategory;

    /// The operation this value describes.
    fn tag(&self) -> EffectTag;

    /// Identifier of the resource the operation targets, if it has one.
    fn resource_id(&self) -> Option<String> {
        None
    }
}

// =============================================================================
// Effect
// =============================================================================

/// Any effect a program may yield.
///
/// Adding a category here without wiring it into the composite
/// interpreter's `match` is a compile error.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// See [`PersistenceEffect`].
    Persistence(PersistenceEffect),
    /// See [`CacheEffect`].
    Cache(CacheEffect),
    /// See [`MessagingEffect`].
    Messaging(MessagingEffect),
    /// See [`StorageEffect`].
    Storage(StorageEffect),
    /// See [`IdentityEffect`].
    Identity(IdentityEffect),
    /// See [`HealthcareEffect`].
    Healthcare(HealthcareEffect),
}

impl Effect {
    /// The category of the wrapped operation.
    #[must_use]
    pub const fn category(&self) -> EffectCategory {
        match self {
            Self::Persistence(_) => PersistenceEffect::CATEGORY,
            Self::Cache(_) => CacheEffect::CATEGORY,
            Self::Messaging(_) => MessagingEffect::CATEGORY,
            Self::Storage(_) => StorageEffect::CATEGORY,
            Self::Identity(_) => IdentityEffect::CATEGORY,
            Self::Healthcare(_) => HealthcareEffect::CATEGORY,
        }
    }

    /// The wrapped operation's tag.
    #[must_use]
    pub fn tag(&self) -> EffectTag {
        match self {
            Self::Persistence(effect) => effect.tag(),
            Self::Cache(effect) => effect.tag(),
            Self::Messaging(effect) => effect.tag(),
            Self::Storage(effect) => effect.tag(),
            Self::Identity(effect) => effect.tag(),
            Self::Healthcare(effect) => effect.tag(),
        }
    }

    /// Identifier of the targeted resource, if the variant carries one.
    #[must_use]
    pub fn resource_id(&self) -> Option<String> {
        match self {
            Self::Persistence(effect) => effect.resource_id(),
            Self::Cache(effect) => effect.resource_id(),
            Self::Messaging(effect) => effect.resource_id(),
            Self::Storage(effect) => effect.resource_id(),
            Self::Identity(effect) => effect.resource_id(),
            Self::Healthcare(effect) => effect.resource_id(),
        }
    }

    /// Whether the operation touches regulated data.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.tag().is_sensitive()
    }
}

macro_rules! effect_from_category {
    ($($category:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$category> for Effect {
                fn from(effect: $category) -> Self {
                    Self::$variant(effect)
                }
            }
        )*
    };
}

effect_from_category! {
    PersistenceEffect => Persistence,
    CacheEffect => Cache,
    MessagingEffect => Messaging,
    StorageEffect => Storage,
    IdentityEffect => Identity,
    HealthcareEffect => Healthcare,
}

// =============================================================================
// Lookup
// =============================================================================

/// Outcome of fetching something by identifier.
///
/// `NotFound` is a domain outcome, not a failure: the lookup executed and
/// the answer is "nothing there".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookup<T> {
    /// The resource exists.
    Found(T),
    /// No resource has the requested identifier.
    NotFound {
        /// The identifier that was looked up.
        id: String,
    },
}

impl<T> Lookup<T> {
    /// Builds a lookup outcome from an optional collaborator answer.
    #[must_use]
    pub fn from_option(value: Option<T>, id: impl Into<String>) -> Self {
        match value {
            Some(found) => Self::Found(found),
            None => Self::NotFound { id: id.into() },
        }
    }

    /// Returns `true` for `Found`.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Converts into an `Option`, dropping the identifier.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound { .. } => None,
        }
    }

    /// Transforms the found value.
    #[must_use]
    pub fn map<U, F>(self, function: F) -> Lookup<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Found(value) => Lookup::Found(function(value)),
            Self::NotFound { id } => Lookup::NotFound { id },
        }
    }
}
