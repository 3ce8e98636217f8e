//! One interpreter per effect category.
//!
//! Each interpreter matches exhaustively on the variants of its category
//! and makes exactly one collaborator call per effect.

use std::sync::Arc;

use super::{Interpret, Interpretation, complete};
use crate::effect::{
    CacheEffect, EffectValue, HealthcareEffect, IdentityEffect, Lookup, MessagingEffect, Operation,
    PersistenceEffect, StorageEffect,
};
use crate::ports::{
    Cache, ClinicalRecords, MessageBroker, ObjectStore, PasswordHasher, RecordRepository,
    TokenProvider,
};

// =============================================================================
// PersistenceInterpreter
// =============================================================================

/// Executes [`PersistenceEffect`]s against a [`RecordRepository`].
#[derive(Clone)]
pub struct PersistenceInterpreter {
    repository: Arc<dyn RecordRepository>,
}

impl PersistenceInterpreter {
    /// Wraps a repository.
    #[must_use]
    pub fn new(repository: Arc<dyn RecordRepository>) -> Self {
        Self { repository }
    }
}

impl Interpret<PersistenceEffect> for PersistenceInterpreter {
    fn interpret(&self, effect: PersistenceEffect) -> Interpretation {
        let tag = effect.tag();
        match effect {
            PersistenceEffect::GetRecord { id } => {
                let requested = id.to_string();
                complete(tag, self.repository.find(&id), move |found| {
                    EffectValue::Record(Lookup::from_option(found, requested))
                })
            }
            PersistenceEffect::SaveRecord { record } => {
                complete(tag, self.repository.save(&record), EffectValue::from)
            }
            PersistenceEffect::DeleteRecord { id } => {
                complete(tag, self.repository.delete(&id), EffectValue::from)
            }
            PersistenceEffect::ListRecords { collection } => {
                complete(tag, self.repository.list(&collection), EffectValue::Records)
            }
        }
    }
}

// =============================================================================
// CacheInterpreter
// =============================================================================

/// Executes [`CacheEffect`]s against a [`Cache`].
#[derive(Clone)]
pub struct CacheInterpreter {
    cache: Arc<dyn Cache>,
}

impl CacheInterpreter {
    /// Wraps a cache.
    #[must_use]
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

impl Interpret<CacheEffect> for CacheInterpreter {
    fn interpret(&self, effect: CacheEffect) -> Interpretation {
        let tag = effect.tag();
        match effect {
            CacheEffect::Get { key } => complete(tag, self.cache.get(&key), EffectValue::Cached),
            CacheEffect::Put {
                key,
                value,
                time_to_live,
            } => complete(
                tag,
                self.cache.put(&key, &value, time_to_live),
                EffectValue::from,
            ),
            CacheEffect::Invalidate { key } => {
                complete(tag, self.cache.invalidate(&key), EffectValue::from)
            }
        }
    }
}

// =============================================================================
// MessagingInterpreter
// =============================================================================

/// Executes [`MessagingEffect`]s against a [`MessageBroker`].
#[derive(Clone)]
pub struct MessagingInterpreter {
    broker: Arc<dyn MessageBroker>,
}

impl MessagingInterpreter {
    /// Wraps a broker.
    #[must_use]
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }
}

impl Interpret<MessagingEffect> for MessagingInterpreter {
    fn interpret(&self, effect: MessagingEffect) -> Interpretation {
        let tag = effect.tag();
        match effect {
            MessagingEffect::Publish { message } => {
                complete(tag, self.broker.publish(&message), EffectValue::MessageId)
            }
            MessagingEffect::Consume { queue } => {
                complete(tag, self.broker.consume(&queue), EffectValue::Delivery)
            }
            MessagingEffect::Acknowledge { receipt } => {
                complete(tag, self.broker.acknowledge(&receipt), EffectValue::from)
            }
            MessagingEffect::NegativeAcknowledge { receipt, requeue } => complete(
                tag,
                self.broker.negative_acknowledge(&receipt, requeue),
                EffectValue::from,
            ),
        }
    }
}

// =============================================================================
// StorageInterpreter
// =============================================================================

/// Executes [`StorageEffect`]s against an [`ObjectStore`].
#[derive(Clone)]
pub struct StorageInterpreter {
    store: Arc<dyn ObjectStore>,
}

impl StorageInterpreter {
    /// Wraps an object store.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl Interpret<StorageEffect> for StorageInterpreter {
    fn interpret(&self, effect: StorageEffect) -> Interpretation {
        let tag = effect.tag();
        match effect {
            StorageEffect::PutObject { object } => {
                complete(tag, self.store.put(&object), EffectValue::from)
            }
            StorageEffect::GetObject { location } => {
                complete(tag, self.store.get(&location), EffectValue::Object)
            }
            StorageEffect::DeleteObject { location } => {
                complete(tag, self.store.delete(&location), EffectValue::from)
            }
            StorageEffect::ListObjects { bucket, prefix } => {
                complete(tag, self.store.list(&bucket, &prefix), EffectValue::ObjectKeys)
            }
        }
    }
}

// =============================================================================
// IdentityInterpreter
// =============================================================================

/// Executes [`IdentityEffect`]s: token operations against a
/// [`TokenProvider`], password operations against a [`PasswordHasher`].
#[derive(Clone)]
pub struct IdentityInterpreter {
    tokens: Arc<dyn TokenProvider>,
    passwords: Arc<dyn PasswordHasher>,
}

impl IdentityInterpreter {
    /// Wraps both identity collaborators.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenProvider>, passwords: Arc<dyn PasswordHasher>) -> Self {
        Self { tokens, passwords }
    }
}

impl Interpret<IdentityEffect> for IdentityInterpreter {
    fn interpret(&self, effect: IdentityEffect) -> Interpretation {
        let tag = effect.tag();
        match effect {
            IdentityEffect::ValidateToken { token } => {
                complete(tag, self.tokens.validate(&token), EffectValue::TokenValidation)
            }
            IdentityEffect::GenerateToken { subject, roles } => {
                complete(tag, self.tokens.generate(&subject, &roles), EffectValue::TokenPair)
            }
            IdentityEffect::RefreshToken { refresh_token } => {
                complete(tag, self.tokens.refresh(&refresh_token), EffectValue::TokenPair)
            }
            IdentityEffect::RevokeToken { token } => {
                complete(tag, self.tokens.revoke(&token), EffectValue::from)
            }
            IdentityEffect::HashPassword { password } => {
                complete(tag, self.passwords.hash(&password), EffectValue::PasswordHash)
            }
            IdentityEffect::VerifyPassword { password, hash } => complete(
                tag,
                self.passwords.verify(&password, &hash),
                EffectValue::PasswordVerification,
            ),
        }
    }
}

// =============================================================================
// HealthcareInterpreter
// =============================================================================

/// Executes [`HealthcareEffect`]s against [`ClinicalRecords`].
#[derive(Clone)]
pub struct HealthcareInterpreter {
    records: Arc<dyn ClinicalRecords>,
}

impl HealthcareInterpreter {
    /// Wraps the clinical record system.
    #[must_use]
    pub fn new(records: Arc<dyn ClinicalRecords>) -> Self {
        Self { records }
    }
}

impl Interpret<HealthcareEffect> for HealthcareInterpreter {
    fn interpret(&self, effect: HealthcareEffect) -> Interpretation {
        let tag = effect.tag();
        match effect {
            HealthcareEffect::GetPatient { patient_id } => {
                complete(tag, self.records.find_patient(&patient_id), move |found| {
                    EffectValue::Patient(Lookup::from_option(found, patient_id.to_string()))
                })
            }
            HealthcareEffect::GetAppointment { appointment_id } => complete(
                tag,
                self.records.find_appointment(&appointment_id),
                move |found| {
                    EffectValue::Appointment(Lookup::from_option(found, appointment_id.to_string()))
                },
            ),
            HealthcareEffect::SaveAppointment { appointment } => {
                complete(tag, self.records.save_appointment(&appointment), EffectValue::from)
            }
            HealthcareEffect::CheckInteractions {
                patient_id,
                medication,
            } => complete(
                tag,
                self.records.check_interactions(&patient_id, &medication),
                EffectValue::InteractionCheck,
            ),
        }
    }
}
