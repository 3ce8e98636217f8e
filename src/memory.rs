//! In-memory collaborators.
//!
//! Every port has an implementation here backed by maps behind a
//! `parking_lot` lock. They are used by the test suite and the demo
//! binary, and are a reasonable starting point for local development.
//!
//! Like any collaborator, each method only describes the operation: the
//! shared state is touched when the returned [`AsyncIO`] runs.
//!
//! [`InMemoryBackends`] bundles one of each and pre-wires a
//! [`CompositeInterpreterBuilder`].

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::effect::{
    Claims, Delivery, MessageId, ObjectLocation, OutboundMessage, Password, PasswordHash,
    ReceiptHandle, Record, RecordId, StoredObject, Token, TokenPair, TokenValidation,
};
use crate::error::AdapterError;
use crate::healthcare::{
    Appointment, AppointmentId, InteractionCheck, InteractionWarning, Medication, Patient,
    PatientId, Severity,
};
use crate::interpreter::{
    CacheInterpreter, CompositeInterpreterBuilder, HealthcareInterpreter, IdentityInterpreter,
    MessagingInterpreter, PersistenceInterpreter, StorageInterpreter,
};
use crate::io::AsyncIO;
use crate::ports::{
    AdapterIO, AuditSink, Cache, ClinicalRecords, MessageBroker, ObjectStore, PasswordHasher,
    RecordRepository, TokenProvider,
};

// =============================================================================
// InMemoryRecords
// =============================================================================

/// [`RecordRepository`] over a hash map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecords {
    records: Arc<RwLock<HashMap<RecordId, Record>>>,
}

impl InMemoryRecords {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordRepository for InMemoryRecords {
    fn find(&self, id: &RecordId) -> AdapterIO<Option<Record>> {
        let records = Arc::clone(&self.records);
        let id = id.clone();
        AsyncIO::new(move || async move { Ok(records.read().get(&id).cloned()) })
    }

    fn save(&self, record: &Record) -> AdapterIO<()> {
        let records = Arc::clone(&self.records);
        let record = record.clone();
        AsyncIO::new(move || async move {
            tracing::debug!(id = %record.id, collection = %record.collection, "record saved");
            records.write().insert(record.id.clone(), record);
            Ok(())
        })
    }

    fn delete(&self, id: &RecordId) -> AdapterIO<()> {
        let records = Arc::clone(&self.records);
        let id = id.clone();
        AsyncIO::new(move || async move {
            let removed = records.write().remove(&id).is_some();
            tracing::debug!(id = %id, removed, "record deleted");
            Ok(())
        })
    }

    fn list(&self, collection: &str) -> AdapterIO<Vec<Record>> {
        let records = Arc::clone(&self.records);
        let collection = collection.to_string();
        AsyncIO::new(move || async move {
            let mut found: Vec<Record> = records
                .read()
                .values()
                .filter(|record| record.collection == collection)
                .cloned()
                .collect();
            found.sort_by(|left, right| left.id.as_str().cmp(right.id.as_str()));
            Ok(found)
        })
    }
}

// =============================================================================
// InMemoryCache
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    /// `None` when the time to live reaches past what `Instant` can hold.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// [`Cache`] with per-entry expiry. Expired entries read as misses and
/// are evicted on access.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` holds an unexpired entry.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| entry.is_live(Instant::now()))
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> AdapterIO<Option<serde_json::Value>> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        AsyncIO::new(move || async move {
            let now = Instant::now();
            let mut entries = entries.write();
            match entries.get(&key) {
                Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
                Some(_) => {
                    entries.remove(&key);
                    tracing::debug!(key = %key, "cache entry expired");
                    Ok(None)
                }
                None => Ok(None),
            }
        })
    }

    fn put(&self, key: &str, value: &serde_json::Value, time_to_live: Duration) -> AdapterIO<()> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        let value = value.clone();
        AsyncIO::new(move || async move {
            let expires_at = Instant::now().checked_add(time_to_live);
            tracing::debug!(key = %key, ttl_ms = time_to_live.as_millis(), "cache entry stored");
            entries.write().insert(key, CacheEntry { value, expires_at });
            Ok(())
        })
    }

    fn invalidate(&self, key: &str) -> AdapterIO<()> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        AsyncIO::new(move || async move {
            let removed = entries.write().remove(&key).is_some();
            tracing::debug!(key = %key, removed, "cache entry invalidated");
            Ok(())
        })
    }
}

// =============================================================================
// InMemoryBroker
// =============================================================================

#[derive(Debug, Clone)]
struct Envelope {
    message_id: MessageId,
    payload: serde_json::Value,
    attempts: u32,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<Envelope>>,
    in_flight: HashMap<ReceiptHandle, (String, Envelope)>,
    published: Vec<OutboundMessage>,
    dead_letters: Vec<Envelope>,
}

/// [`MessageBroker`] where every topic is also a queue of the same name.
///
/// Consumed messages stay in flight until acknowledged. A negative
/// acknowledgement either puts the message back at the tail of its queue
/// or moves it to the dead letters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    /// Creates a broker with no queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message published so far, in order.
    #[must_use]
    pub fn published(&self) -> Vec<OutboundMessage> {
        self.state.lock().published.clone()
    }

    /// Messages published to `topic`, in order.
    #[must_use]
    pub fn published_to(&self, topic: &str) -> Vec<OutboundMessage> {
        self.state
            .lock()
            .published
            .iter()
            .filter(|message| message.topic == topic)
            .cloned()
            .collect()
    }

    /// Messages waiting in `queue`.
    #[must_use]
    pub fn pending(&self, queue: &str) -> usize {
        self.state.lock().queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Messages consumed but not yet settled.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Messages rejected without requeue.
    #[must_use]
    pub fn dead_letters(&self) -> usize {
        self.state.lock().dead_letters.len()
    }
}

impl MessageBroker for InMemoryBroker {
    fn publish(&self, message: &OutboundMessage) -> AdapterIO<MessageId> {
        let state = Arc::clone(&self.state);
        let message = message.clone();
        AsyncIO::new(move || async move {
            let message_id = MessageId::new(Uuid::new_v4().to_string());
            tracing::debug!(topic = %message.topic, message_id = %message_id, "message published");
            let mut state = state.lock();
            state
                .queues
                .entry(message.topic.clone())
                .or_default()
                .push_back(Envelope {
                    message_id: message_id.clone(),
                    payload: message.payload.clone(),
                    attempts: 0,
                });
            state.published.push(message);
            Ok(message_id)
        })
    }

    fn consume(&self, queue: &str) -> AdapterIO<Option<Delivery>> {
        let state = Arc::clone(&self.state);
        let queue = queue.to_string();
        AsyncIO::new(move || async move {
            let mut state = state.lock();
            let Some(mut envelope) = state.queues.get_mut(&queue).and_then(VecDeque::pop_front)
            else {
                return Ok(None);
            };
            envelope.attempts += 1;
            let receipt = ReceiptHandle::new(Uuid::new_v4().to_string());
            let delivery = Delivery {
                message_id: envelope.message_id.clone(),
                payload: envelope.payload.clone(),
                receipt: receipt.clone(),
                attempts: envelope.attempts,
            };
            tracing::debug!(
                queue = %queue,
                message_id = %envelope.message_id,
                attempts = envelope.attempts,
                "message delivered"
            );
            state.in_flight.insert(receipt, (queue, envelope));
            Ok(Some(delivery))
        })
    }

    fn acknowledge(&self, receipt: &ReceiptHandle) -> AdapterIO<()> {
        let state = Arc::clone(&self.state);
        let receipt = receipt.clone();
        AsyncIO::new(move || async move {
            let (queue, envelope) = state
                .lock()
                .in_flight
                .remove(&receipt)
                .ok_or_else(|| unknown_receipt(&receipt))?;
            tracing::debug!(queue = %queue, message_id = %envelope.message_id, "message acknowledged");
            Ok(())
        })
    }

    fn negative_acknowledge(&self, receipt: &ReceiptHandle, requeue: bool) -> AdapterIO<()> {
        let state = Arc::clone(&self.state);
        let receipt = receipt.clone();
        AsyncIO::new(move || async move {
            let mut state = state.lock();
            let (queue, envelope) = state
                .in_flight
                .remove(&receipt)
                .ok_or_else(|| unknown_receipt(&receipt))?;
            tracing::debug!(
                queue = %queue,
                message_id = %envelope.message_id,
                requeue,
                "message rejected"
            );
            if requeue {
                state.queues.entry(queue).or_default().push_back(envelope);
            } else {
                state.dead_letters.push(envelope);
            }
            Ok(())
        })
    }
}

fn unknown_receipt(receipt: &ReceiptHandle) -> AdapterError {
    AdapterError::Rejected(format!("unknown receipt handle {}", receipt.as_str()))
}

// =============================================================================
// InMemoryObjectStore
// =============================================================================

/// [`ObjectStore`] keyed by bucket then key; listings come back sorted.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<(String, String), StoredObject>>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn object_key(location: &ObjectLocation) -> (String, String) {
    (location.bucket.clone(), location.key.clone())
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, object: &StoredObject) -> AdapterIO<()> {
        let objects = Arc::clone(&self.objects);
        let object = object.clone();
        AsyncIO::new(move || async move {
            tracing::debug!(location = %object.location, bytes = object.bytes.len(), "object stored");
            objects.write().insert(object_key(&object.location), object);
            Ok(())
        })
    }

    fn get(&self, location: &ObjectLocation) -> AdapterIO<Option<StoredObject>> {
        let objects = Arc::clone(&self.objects);
        let key = object_key(location);
        AsyncIO::new(move || async move { Ok(objects.read().get(&key).cloned()) })
    }

    fn delete(&self, location: &ObjectLocation) -> AdapterIO<()> {
        let objects = Arc::clone(&self.objects);
        let location = location.clone();
        AsyncIO::new(move || async move {
            let removed = objects.write().remove(&object_key(&location)).is_some();
            tracing::debug!(location = %location, removed, "object deleted");
            Ok(())
        })
    }

    fn list(&self, bucket: &str, prefix: &str) -> AdapterIO<Vec<String>> {
        let objects = Arc::clone(&self.objects);
        let bucket = bucket.to_string();
        let prefix = prefix.to_string();
        AsyncIO::new(move || async move {
            Ok(objects
                .read()
                .keys()
                .filter(|(stored_bucket, key)| *stored_bucket == bucket && key.starts_with(&prefix))
                .map(|(_, key)| key.clone())
                .collect())
        })
    }
}

// =============================================================================
// InMemoryTokenProvider
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone)]
struct IssuedToken {
    kind: TokenKind,
    claims: Claims,
    revoked: bool,
}

/// [`TokenProvider`] issuing opaque random tokens.
///
/// Refreshing rotates the refresh token: the one presented is revoked.
#[derive(Debug, Clone)]
pub struct InMemoryTokenProvider {
    issued: Arc<RwLock<HashMap<String, IssuedToken>>>,
    access_lifetime: chrono::Duration,
    refresh_lifetime: chrono::Duration,
}

impl Default for InMemoryTokenProvider {
    fn default() -> Self {
        Self {
            issued: Arc::default(),
            access_lifetime: chrono::Duration::minutes(15),
            refresh_lifetime: chrono::Duration::days(7),
        }
    }
}

impl InMemoryTokenProvider {
    /// Creates a provider with 15 minute access and 7 day refresh tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_lifetime(self, access_lifetime: chrono::Duration) -> Self {
        Self {
            access_lifetime,
            ..self
        }
    }

    fn issue(
        issued: &RwLock<HashMap<String, IssuedToken>>,
        subject: &str,
        roles: &[String],
        access_lifetime: chrono::Duration,
        refresh_lifetime: chrono::Duration,
    ) -> Result<TokenPair, AdapterError> {
        let now = Utc::now();
        let expiry = |lifetime: chrono::Duration| {
            now.checked_add_signed(lifetime).ok_or_else(|| {
                AdapterError::Rejected(format!("token lifetime {lifetime} is out of range"))
            })
        };
        let access_expires_at = expiry(access_lifetime)?;
        let refresh_expires_at = expiry(refresh_lifetime)?;
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        let claims = |expires_at| Claims {
            subject: subject.to_string(),
            roles: roles.to_vec(),
            expires_at,
        };

        let mut issued = issued.write();
        issued.insert(
            access_token.clone(),
            IssuedToken {
                kind: TokenKind::Access,
                claims: claims(access_expires_at),
                revoked: false,
            },
        );
        issued.insert(
            refresh_token.clone(),
            IssuedToken {
                kind: TokenKind::Refresh,
                claims: claims(refresh_expires_at),
                revoked: false,
            },
        );
        tracing::debug!(subject = %subject, "token pair issued");

        Ok(TokenPair {
            access_token: Token::new(access_token),
            refresh_token: Token::new(refresh_token),
            expires_at: access_expires_at,
        })
    }
}

impl TokenProvider for InMemoryTokenProvider {
    fn validate(&self, token: &Token) -> AdapterIO<TokenValidation> {
        let issued = Arc::clone(&self.issued);
        let token = token.clone();
        AsyncIO::new(move || async move {
            let validation = match issued.read().get(token.expose()) {
                None => TokenValidation::Invalid {
                    reason: "unknown token".to_string(),
                },
                Some(entry) if entry.revoked => TokenValidation::Invalid {
                    reason: "revoked".to_string(),
                },
                Some(entry) if entry.kind != TokenKind::Access => TokenValidation::Invalid {
                    reason: "not an access token".to_string(),
                },
                Some(entry) if entry.claims.expires_at <= Utc::now() => TokenValidation::Expired,
                Some(entry) => TokenValidation::Valid(entry.claims.clone()),
            };
            Ok(validation)
        })
    }

    fn generate(&self, subject: &str, roles: &[String]) -> AdapterIO<TokenPair> {
        let issued = Arc::clone(&self.issued);
        let subject = subject.to_string();
        let roles = roles.to_vec();
        let (access_lifetime, refresh_lifetime) = (self.access_lifetime, self.refresh_lifetime);
        AsyncIO::new(move || async move {
            Self::issue(
                &issued,
                &subject,
                &roles,
                access_lifetime,
                refresh_lifetime,
            )
        })
    }

    fn refresh(&self, refresh_token: &Token) -> AdapterIO<TokenPair> {
        let issued = Arc::clone(&self.issued);
        let refresh_token = refresh_token.clone();
        let (access_lifetime, refresh_lifetime) = (self.access_lifetime, self.refresh_lifetime);
        AsyncIO::new(move || async move {
            let claims = {
                let mut tokens = issued.write();
                let entry = tokens
                    .get_mut(refresh_token.expose())
                    .filter(|entry| {
                        entry.kind == TokenKind::Refresh
                            && !entry.revoked
                            && entry.claims.expires_at > Utc::now()
                    })
                    .ok_or_else(|| {
                        AdapterError::Rejected("refresh token is not usable".to_string())
                    })?;
                entry.revoked = true;
                entry.claims.clone()
            };
            Self::issue(
                &issued,
                &claims.subject,
                &claims.roles,
                access_lifetime,
                refresh_lifetime,
            )
        })
    }

    fn revoke(&self, token: &Token) -> AdapterIO<()> {
        let issued = Arc::clone(&self.issued);
        let token = token.clone();
        AsyncIO::new(move || async move {
            if let Some(entry) = issued.write().get_mut(token.expose()) {
                entry.revoked = true;
                tracing::debug!(subject = %entry.claims.subject, "token revoked");
            }
            Ok(())
        })
    }
}

// =============================================================================
// Sha256PasswordHasher
// =============================================================================

const HASH_SCHEME: &str = "sha256";

/// [`PasswordHasher`] producing `sha256$<salt>$<hex digest>` with a random
/// salt per hash.
///
/// Plain salted SHA-256 is fast by construction; production deployments
/// should sit a memory-hard hasher behind the same port.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256PasswordHasher;

impl Sha256PasswordHasher {
    /// Creates a hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn digest(salt: &str, password: &Password) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.expose().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, password: &Password) -> AdapterIO<PasswordHash> {
        let password = password.clone();
        AsyncIO::new(move || async move {
            let salt = Uuid::new_v4().simple().to_string();
            let digest = Self::digest(&salt, &password);
            Ok(PasswordHash::new(format!("{HASH_SCHEME}${salt}${digest}")))
        })
    }

    fn verify(&self, password: &Password, hash: &PasswordHash) -> AdapterIO<bool> {
        let password = password.clone();
        let hash = hash.clone();
        AsyncIO::new(move || async move {
            let mut parts = hash.as_str().splitn(3, '$');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(HASH_SCHEME), Some(salt), Some(digest)) => {
                    Ok(Self::digest(salt, &password) == digest)
                }
                _ => Err(AdapterError::Malformed(
                    "password hash is not in sha256$salt$digest form".to_string(),
                )),
            }
        })
    }
}

// =============================================================================
// InMemoryClinicalRecords
// =============================================================================

#[derive(Debug, Clone)]
struct InteractionRule {
    first: String,
    second: String,
    severity: Severity,
    description: String,
}

impl InteractionRule {
    fn between(&self, left: &str, right: &str) -> bool {
        (self.first == left && self.second == right) || (self.first == right && self.second == left)
    }
}

#[derive(Debug, Default)]
struct ClinicalState {
    patients: HashMap<PatientId, Patient>,
    appointments: HashMap<AppointmentId, Appointment>,
    prescriptions: HashMap<PatientId, Vec<Medication>>,
    rules: Vec<InteractionRule>,
}

/// [`ClinicalRecords`] with a symmetric interaction table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClinicalRecords {
    state: Arc<RwLock<ClinicalState>>,
}

impl InMemoryClinicalRecords {
    /// Creates an empty record system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a patient.
    #[must_use]
    pub fn with_patient(self, patient: Patient) -> Self {
        self.state.write().patients.insert(patient.id, patient);
        self
    }

    /// Records that `patient_id` currently takes `medication`.
    #[must_use]
    pub fn with_prescription(self, patient_id: PatientId, medication: Medication) -> Self {
        self.state
            .write()
            .prescriptions
            .entry(patient_id)
            .or_default()
            .push(medication);
        self
    }

    /// Declares that medications coded `first` and `second` interact.
    #[must_use]
    pub fn with_interaction(
        self,
        first: impl Into<String>,
        second: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        self.state.write().rules.push(InteractionRule {
            first: first.into(),
            second: second.into(),
            severity,
            description: description.into(),
        });
        self
    }

    /// The stored appointment, if any.
    #[must_use]
    pub fn appointment(&self, appointment_id: &AppointmentId) -> Option<Appointment> {
        self.state.read().appointments.get(appointment_id).cloned()
    }
}

impl ClinicalRecords for InMemoryClinicalRecords {
    fn find_patient(&self, patient_id: &PatientId) -> AdapterIO<Option<Patient>> {
        let state = Arc::clone(&self.state);
        let patient_id = *patient_id;
        AsyncIO::new(move || async move { Ok(state.read().patients.get(&patient_id).cloned()) })
    }

    fn find_appointment(&self, appointment_id: &AppointmentId) -> AdapterIO<Option<Appointment>> {
        let state = Arc::clone(&self.state);
        let appointment_id = *appointment_id;
        AsyncIO::new(move || async move {
            Ok(state.read().appointments.get(&appointment_id).cloned())
        })
    }

    fn save_appointment(&self, appointment: &Appointment) -> AdapterIO<()> {
        let state = Arc::clone(&self.state);
        let appointment = appointment.clone();
        AsyncIO::new(move || async move {
            tracing::debug!(
                appointment_id = %appointment.id(),
                status = %appointment.status(),
                "appointment saved"
            );
            state
                .write()
                .appointments
                .insert(appointment.id(), appointment);
            Ok(())
        })
    }

    fn check_interactions(
        &self,
        patient_id: &PatientId,
        medication: &Medication,
    ) -> AdapterIO<InteractionCheck> {
        let state = Arc::clone(&self.state);
        let patient_id = *patient_id;
        let medication = medication.clone();
        AsyncIO::new(move || async move {
            let state = state.read();
            let current = state
                .prescriptions
                .get(&patient_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let warnings = current
                .iter()
                .flat_map(|taken| {
                    state
                        .rules
                        .iter()
                        .filter(|rule| rule.between(&taken.code, &medication.code))
                        .map(|rule| InteractionWarning {
                            interacts_with: taken.code.clone(),
                            severity: rule.severity,
                            description: rule.description.clone(),
                        })
                })
                .collect();
            Ok(InteractionCheck::from_warnings(warnings))
        })
    }
}

// =============================================================================
// RecordingAuditSink
// =============================================================================

/// [`AuditSink`] keeping entries in memory. Can be switched off to
/// simulate an unavailable audit store.
#[derive(Debug, Clone)]
pub struct RecordingAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
    available: Arc<RwLock<bool>>,
}

impl Default for RecordingAuditSink {
    fn default() -> Self {
        Self {
            entries: Arc::default(),
            available: Arc::new(RwLock::new(true)),
        }
    }
}

impl RecordingAuditSink {
    /// Creates an available, empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes later writes succeed (`true`) or fail as unavailable.
    pub fn set_available(&self, available: bool) {
        *self.available.write() = available;
    }

    /// Entries recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, entry: &AuditEntry) -> AdapterIO<()> {
        let entries = Arc::clone(&self.entries);
        let available = Arc::clone(&self.available);
        let entry = entry.clone();
        AsyncIO::new(move || async move {
            if !*available.read() {
                return Err(AdapterError::Unavailable("audit store offline".to_string()));
            }
            tracing::debug!(effect = %entry.effect, actor_id = %entry.actor_id, "audit entry recorded");
            entries.lock().push(entry);
            Ok(())
        })
    }
}

// =============================================================================
// InMemoryBackends
// =============================================================================

/// One in-memory collaborator per port.
///
/// Fields are public so tests can seed and inspect state; collaborators
/// share state with their clones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackends {
    /// Record repository.
    pub records: InMemoryRecords,
    /// Cache.
    pub cache: InMemoryCache,
    /// Message broker.
    pub broker: InMemoryBroker,
    /// Object store.
    pub objects: InMemoryObjectStore,
    /// Token provider.
    pub tokens: InMemoryTokenProvider,
    /// Password hasher.
    pub passwords: Sha256PasswordHasher,
    /// Clinical record system.
    pub clinical: InMemoryClinicalRecords,
    /// Audit sink.
    pub audit: RecordingAuditSink,
}

impl InMemoryBackends {
    /// Creates empty backends.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the clinical record system.
    #[must_use]
    pub fn with_clinical(self, clinical: InMemoryClinicalRecords) -> Self {
        Self { clinical, ..self }
    }

    /// A builder with every category routed to these backends.
    ///
    /// Audit and metrics are left to the caller.
    #[must_use]
    pub fn composite(&self) -> CompositeInterpreterBuilder {
        crate::interpreter::CompositeInterpreter::builder()
            .with_persistence(PersistenceInterpreter::new(Arc::new(self.records.clone())))
            .with_cache(CacheInterpreter::new(Arc::new(self.cache.clone())))
            .with_messaging(MessagingInterpreter::new(Arc::new(self.broker.clone())))
            .with_storage(StorageInterpreter::new(Arc::new(self.objects.clone())))
            .with_identity(IdentityInterpreter::new(
                Arc::new(self.tokens.clone()),
                Arc::new(self.passwords),
            ))
            .with_healthcare(HealthcareInterpreter::new(Arc::new(self.clinical.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[tokio::test]
    async fn cache_entry_expires() {
        let cache = InMemoryCache::new();
        cache.put("k", &json!(1), Duration::ZERO).run_async().await.unwrap();
        assert_eq!(cache.get("k").run_async().await, Ok(None));

        cache.put("k", &json!(2), Duration::from_secs(60)).run_async().await.unwrap();
        assert_eq!(cache.get("k").run_async().await, Ok(Some(json!(2))));
        assert!(cache.contains("k"));
    }

    #[rstest]
    #[tokio::test]
    async fn cache_ttl_past_instant_range_never_expires() {
        let cache = InMemoryCache::new();
        cache
            .put("k", &json!(1), Duration::from_secs(u64::MAX))
            .run_async()
            .await
            .unwrap();
        assert_eq!(cache.get("k").run_async().await, Ok(Some(json!(1))));
        assert!(cache.contains("k"));
    }

    #[rstest]
    #[tokio::test]
    async fn token_lifetime_out_of_range_is_rejected() {
        let provider = InMemoryTokenProvider::new().with_access_lifetime(chrono::Duration::MAX);
        let outcome = provider.generate("svc", &[]).run_async().await;
        assert!(matches!(outcome, Err(AdapterError::Rejected(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn nothing_happens_until_run() {
        let records = InMemoryRecords::new();
        let pending = records.save(&Record::new(RecordId::new("a"), "notes", json!({})));
        assert!(records.is_empty());
        pending.run_async().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn records_list_by_collection() {
        let records = InMemoryRecords::new();
        for (id, collection) in [("b", "notes"), ("a", "notes"), ("c", "labs")] {
            records
                .save(&Record::new(RecordId::new(id), collection, json!(null)))
                .run_async()
                .await
                .unwrap();
        }
        let notes = records.list("notes").run_async().await.unwrap();
        let ids: Vec<&str> = notes.iter().map(|record| record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[rstest]
    #[case(true, 1, 0)]
    #[case(false, 0, 1)]
    #[tokio::test]
    async fn broker_nack_requeues_or_dead_letters(
        #[case] requeue: bool,
        #[case] pending: usize,
        #[case] dead: usize,
    ) {
        let broker = InMemoryBroker::new();
        broker
            .publish(&OutboundMessage::new("jobs", json!({"n": 1})))
            .run_async()
            .await
            .unwrap();

        let delivery = broker.consume("jobs").run_async().await.unwrap().unwrap();
        assert_eq!(delivery.attempts, 1);
        assert_eq!(broker.in_flight(), 1);

        broker
            .negative_acknowledge(&delivery.receipt, requeue)
            .run_async()
            .await
            .unwrap();
        assert_eq!(broker.pending("jobs"), pending);
        assert_eq!(broker.dead_letters(), dead);
        assert_eq!(broker.in_flight(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn broker_redelivery_counts_attempts_and_rejects_stale_receipts() {
        let broker = InMemoryBroker::new();
        broker
            .publish(&OutboundMessage::new("jobs", json!(1)))
            .run_async()
            .await
            .unwrap();
        let first = broker.consume("jobs").run_async().await.unwrap().unwrap();
        broker
            .negative_acknowledge(&first.receipt, true)
            .run_async()
            .await
            .unwrap();
        let second = broker.consume("jobs").run_async().await.unwrap().unwrap();
        assert_eq!(second.attempts, 2);
        assert_eq!(second.message_id, first.message_id);

        broker.acknowledge(&second.receipt).run_async().await.unwrap();
        let stale = broker.acknowledge(&first.receipt).run_async().await;
        assert!(matches!(stale, Err(AdapterError::Rejected(_))));
        assert_eq!(broker.consume("jobs").run_async().await, Ok(None));
    }

    #[rstest]
    #[tokio::test]
    async fn object_listing_filters_by_bucket_and_prefix() {
        let store = InMemoryObjectStore::new();
        for (bucket, key) in [("scans", "2024/b.png"), ("scans", "2024/a.png"), ("scans", "2023/c.png"), ("docs", "2024/d.pdf")] {
            store
                .put(&StoredObject {
                    location: ObjectLocation::new(bucket, key),
                    content_type: "application/octet-stream".to_string(),
                    bytes: vec![0],
                })
                .run_async()
                .await
                .unwrap();
        }
        let keys = store.list("scans", "2024/").run_async().await.unwrap();
        assert_eq!(keys, vec!["2024/a.png".to_string(), "2024/b.png".to_string()]);
    }

    #[rstest]
    #[tokio::test]
    async fn tokens_validate_refresh_and_revoke() {
        let provider = InMemoryTokenProvider::new();
        let pair = provider
            .generate("nurse-1", &["nurse".to_string()])
            .run_async()
            .await
            .unwrap();

        let validation = provider.validate(&pair.access_token).run_async().await.unwrap();
        assert_eq!(validation.claims().map(|claims| claims.subject.as_str()), Some("nurse-1"));

        let refreshed = provider.refresh(&pair.refresh_token).run_async().await.unwrap();
        assert!(provider.refresh(&pair.refresh_token).run_async().await.is_err());

        provider.revoke(&refreshed.access_token).run_async().await.unwrap();
        assert_eq!(
            provider.validate(&refreshed.access_token).run_async().await.unwrap(),
            TokenValidation::Invalid {
                reason: "revoked".to_string()
            }
        );
        assert!(matches!(
            provider.validate(&pair.refresh_token).run_async().await.unwrap(),
            TokenValidation::Invalid { .. }
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn expired_access_token_is_reported() {
        let provider = InMemoryTokenProvider::new().with_access_lifetime(chrono::Duration::zero());
        let pair = provider.generate("u", &[]).run_async().await.unwrap();
        assert_eq!(
            provider.validate(&pair.access_token).run_async().await.unwrap(),
            TokenValidation::Expired
        );
    }

    #[rstest]
    #[tokio::test]
    async fn password_hashes_are_salted_and_verifiable() {
        let hasher = Sha256PasswordHasher::new();
        let password = Password::new("correct horse");
        let first = hasher.hash(&password).run_async().await.unwrap();
        let second = hasher.hash(&password).run_async().await.unwrap();

        assert_ne!(first, second);
        assert_eq!(hasher.verify(&password, &first).run_async().await, Ok(true));
        assert_eq!(
            hasher.verify(&Password::new("wrong"), &first).run_async().await,
            Ok(false)
        );
        assert!(matches!(
            hasher
                .verify(&password, &PasswordHash::new("plain"))
                .run_async()
                .await,
            Err(AdapterError::Malformed(_))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn interactions_are_symmetric() {
        let patient_id = PatientId::new();
        let records = InMemoryClinicalRecords::new()
            .with_prescription(patient_id, Medication::new("WARF", "Warfarin"))
            .with_interaction("ASA", "WARF", Severity::Severe, "bleeding risk");

        let check = records
            .check_interactions(&patient_id, &Medication::new("ASA", "Aspirin"))
            .run_async()
            .await
            .unwrap();
        assert_eq!(check.highest_severity(), Some(Severity::Severe));

        let clear = records
            .check_interactions(&PatientId::new(), &Medication::new("ASA", "Aspirin"))
            .run_async()
            .await
            .unwrap();
        assert_eq!(clear, InteractionCheck::Clear);
    }

    #[rstest]
    #[tokio::test]
    async fn audit_sink_can_go_offline() {
        let sink = RecordingAuditSink::new();
        let entry = AuditEntry {
            category: crate::effect::EffectCategory::Healthcare,
            effect: crate::effect::EffectTag::GetPatient,
            resource_id: None,
            actor_id: "system".to_string(),
            service: "test".to_string(),
            recorded_at: Utc::now(),
        };
        sink.record(&entry).run_async().await.unwrap();
        sink.set_available(false);
        assert!(sink.record(&entry).run_async().await.is_err());
        assert_eq!(sink.entries().len(), 1);
    }
}
