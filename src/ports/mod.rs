//! Collaborator protocols.
//!
//! The engine depends on infrastructure only through these traits. Each
//! method describes one backend call as a deferred [`AsyncIO`]; nothing
//! touches the backend until the interpreter runs it. Implementations own
//! their concurrency control (pooling, locking) and must be shareable
//! across concurrently running programs.
//!
//! "Not found" answers are `Ok(None)`, never errors.

use std::time::Duration;

use crate::audit::AuditEntry;
use crate::effect::{
    Delivery, MessageId, ObjectLocation, OutboundMessage, Password, PasswordHash, ReceiptHandle,
    Record, RecordId, StoredObject, Token, TokenPair, TokenValidation,
};
use crate::error::AdapterError;
use crate::healthcare::{
    Appointment, AppointmentId, InteractionCheck, Medication, Patient, PatientId,
};
use crate::io::AsyncIO;

/// Deferred result of one collaborator call.
pub type AdapterIO<T> = AsyncIO<Result<T, AdapterError>>;

// =============================================================================
// RecordRepository
// =============================================================================

/// Schemaless record storage.
pub trait RecordRepository: Send + Sync {
    /// Fetches one record.
    fn find(&self, id: &RecordId) -> AdapterIO<Option<Record>>;

    /// Inserts or replaces a record.
    fn save(&self, record: &Record) -> AdapterIO<()>;

    /// Removes a record; removing a missing record succeeds.
    fn delete(&self, id: &RecordId) -> AdapterIO<()>;

    /// Every record of a collection.
    fn list(&self, collection: &str) -> AdapterIO<Vec<Record>>;
}

// =============================================================================
// Cache
// =============================================================================

/// Key/value cache with per-entry expiry.
pub trait Cache: Send + Sync {
    /// Reads a live entry.
    fn get(&self, key: &str) -> AdapterIO<Option<serde_json::Value>>;

    /// Writes an entry that expires after `time_to_live`.
    fn put(&self, key: &str, value: &serde_json::Value, time_to_live: Duration) -> AdapterIO<()>;

    /// Drops an entry.
    fn invalidate(&self, key: &str) -> AdapterIO<()>;
}

// =============================================================================
// MessageBroker
// =============================================================================

/// At-least-once message broker.
pub trait MessageBroker: Send + Sync {
    /// Publishes a message, returning its broker identifier.
    fn publish(&self, message: &OutboundMessage) -> AdapterIO<MessageId>;

    /// Takes the next message of `queue` without settling it.
    fn consume(&self, queue: &str) -> AdapterIO<Option<Delivery>>;

    /// Settles a delivery as processed.
    fn acknowledge(&self, receipt: &ReceiptHandle) -> AdapterIO<()>;

    /// Settles a delivery as failed, optionally putting it back on its queue.
    fn negative_acknowledge(&self, receipt: &ReceiptHandle, requeue: bool) -> AdapterIO<()>;
}

// =============================================================================
// ObjectStore
// =============================================================================

/// Bucketed blob storage.
pub trait ObjectStore: Send + Sync {
    /// Writes an object.
    fn put(&self, object: &StoredObject) -> AdapterIO<()>;

    /// Reads an object.
    fn get(&self, location: &ObjectLocation) -> AdapterIO<Option<StoredObject>>;

    /// Removes an object.
    fn delete(&self, location: &ObjectLocation) -> AdapterIO<()>;

    /// Keys in `bucket` starting with `prefix`, sorted.
    fn list(&self, bucket: &str, prefix: &str) -> AdapterIO<Vec<String>>;
}

// =============================================================================
// TokenProvider / PasswordHasher
// =============================================================================

/// Issues and checks bearer tokens.
pub trait TokenProvider: Send + Sync {
    /// Checks a bearer token.
    fn validate(&self, token: &Token) -> AdapterIO<TokenValidation>;

    /// Issues a token pair for `subject`.
    fn generate(&self, subject: &str, roles: &[String]) -> AdapterIO<TokenPair>;

    /// Exchanges a refresh token for a new pair. An unknown refresh token
    /// is reported as [`AdapterError::Rejected`].
    fn refresh(&self, refresh_token: &Token) -> AdapterIO<TokenPair>;

    /// Invalidates a token.
    fn revoke(&self, token: &Token) -> AdapterIO<()>;
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a password with a fresh salt.
    fn hash(&self, password: &Password) -> AdapterIO<PasswordHash>;

    /// Checks a password against a stored hash.
    fn verify(&self, password: &Password, hash: &PasswordHash) -> AdapterIO<bool>;
}

// =============================================================================
// ClinicalRecords
// =============================================================================

/// Patient and appointment records of the clinic.
pub trait ClinicalRecords: Send + Sync {
    /// Fetches a patient.
    fn find_patient(&self, patient_id: &PatientId) -> AdapterIO<Option<Patient>>;

    /// Fetches an appointment.
    fn find_appointment(&self, appointment_id: &AppointmentId) -> AdapterIO<Option<Appointment>>;

    /// Stores an appointment in its current state.
    fn save_appointment(&self, appointment: &Appointment) -> AdapterIO<()>;

    /// Checks `medication` against the patient's current prescriptions.
    fn check_interactions(
        &self,
        patient_id: &PatientId,
        medication: &Medication,
    ) -> AdapterIO<InteractionCheck>;
}

// =============================================================================
// AuditSink
// =============================================================================

/// Durable destination of audit entries.
pub trait AuditSink: Send + Sync {
    /// Persists one entry.
    fn record(&self, entry: &AuditEntry) -> AdapterIO<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCache {
        reads: Arc<AtomicUsize>,
    }

    impl Cache for CountingCache {
        fn get(&self, _key: &str) -> AdapterIO<Option<serde_json::Value>> {
            let reads = Arc::clone(&self.reads);
            AsyncIO::new(move || async move {
                reads.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
        }

        fn put(&self, _key: &str, _value: &serde_json::Value, _ttl: Duration) -> AdapterIO<()> {
            AsyncIO::pure(Ok(()))
        }

        fn invalidate(&self, _key: &str) -> AdapterIO<()> {
            AsyncIO::pure(Err(AdapterError::Unavailable("read only".into())))
        }
    }

    #[rstest]
    #[tokio::test]
    async fn collaborator_calls_are_deferred() {
        let cache = CountingCache::default();
        let pending = cache.get("k");
        assert_eq!(cache.reads.load(Ordering::SeqCst), 0);

        assert_eq!(pending.run_async().await, Ok(None));
        assert_eq!(cache.reads.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn ports_are_object_safe() {
        let cache: Arc<dyn Cache> = Arc::new(CountingCache::default());
        let error = cache.invalidate("k").run_async().await.unwrap_err();
        assert!(error.is_transient());
    }
}
