//! Audit trail of access to regulated data.
//!
//! Before a sensitive effect is dispatched, the composite interpreter asks
//! its [`AuditPolicy`] to record who touched which resource. What happens
//! when the record cannot be written is the [`AuditFailurePolicy`]:
//! [`Block`](AuditFailurePolicy::Block) (the default) fails the effect
//! without executing it, [`LogAndContinue`](AuditFailurePolicy::LogAndContinue)
//! logs a warning and proceeds.
//!
//! Entries are immutable once created and carry identifiers only, never
//! the effect payload.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::effect::{Effect, EffectCategory, EffectTag};
use crate::error::InterpreterError;
use crate::io::AsyncIO;
use crate::ports::{AdapterIO, AuditSink};

// =============================================================================
// Actor
// =============================================================================

/// Who a program runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identifier (user id, service account).
    pub id: String,
    /// Roles held while running.
    pub roles: Vec<String>,
}

impl Actor {
    /// The engine itself, for work not triggered by a person.
    #[must_use]
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
            roles: Vec::new(),
        }
    }

    /// A user with the given roles.
    #[must_use]
    pub fn user(id: impl Into<String>, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// AuditEntry
// =============================================================================

/// One access to regulated data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Category of the effect.
    pub category: EffectCategory,
    /// The operation.
    pub effect: EffectTag,
    /// Resource the operation targets, when the effect names one.
    pub resource_id: Option<String>,
    /// Who asked for it.
    pub actor_id: String,
    /// Service that executed it.
    pub service: String,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Describes `effect` performed by `actor`.
    #[must_use]
    pub fn for_effect(
        effect: &Effect,
        actor: &Actor,
        service: &str,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            category: effect.category(),
            effect: effect.tag(),
            resource_id: effect.resource_id(),
            actor_id: actor.id.clone(),
            service: service.to_string(),
            recorded_at,
        }
    }
}

// =============================================================================
// AuditFailurePolicy
// =============================================================================

/// What to do with a sensitive effect whose audit record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditFailurePolicy {
    /// Fail the effect with [`InterpreterError::Audit`]; it never executes.
    #[default]
    Block,
    /// Log a warning and execute the effect anyway.
    LogAndContinue,
}

impl fmt::Display for AuditFailurePolicy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Block => "block",
            Self::LogAndContinue => "log",
        })
    }
}

impl FromStr for AuditFailurePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "log" | "log_and_continue" => Ok(Self::LogAndContinue),
            other => Err(ConfigError::invalid(
                "EFFECTUM_AUDIT_FAILURE_POLICY",
                format!("expected `block` or `log`, got `{other}`"),
            )),
        }
    }
}

// =============================================================================
// AuditPolicy
// =============================================================================

/// Pre-dispatch audit step of the composite interpreter.
#[derive(Clone)]
pub struct AuditPolicy {
    sink: Arc<dyn AuditSink>,
    actor: Actor,
    service: String,
    on_failure: AuditFailurePolicy,
}

impl AuditPolicy {
    /// Creates a policy writing to `sink` on behalf of [`Actor::system`].
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>, service: impl Into<String>) -> Self {
        Self {
            sink,
            actor: Actor::system(),
            service: service.into(),
            on_failure: AuditFailurePolicy::default(),
        }
    }

    /// Records entries on behalf of `actor`.
    #[must_use]
    pub fn with_actor(self, actor: Actor) -> Self {
        Self { actor, ..self }
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(self, on_failure: AuditFailurePolicy) -> Self {
        Self { on_failure, ..self }
    }

    /// The actor entries are recorded for.
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    /// The failure policy in force.
    #[must_use]
    pub const fn failure_policy(&self) -> AuditFailurePolicy {
        self.on_failure
    }

    /// Records `effect` and decides whether it may proceed.
    ///
    /// The returned action resolves to `Ok(())` when dispatch may go ahead.
    /// The entry is timestamped when the action runs.
    pub fn guard(&self, effect: &Effect) -> AsyncIO<Result<(), InterpreterError>> {
        let tag = effect.tag();
        let on_failure = self.on_failure;
        let sink = Arc::clone(&self.sink);
        let effect = effect.clone();
        let actor = self.actor.clone();
        let service = self.service.clone();

        AsyncIO::new(move || async move {
            AuditEntry::for_effect(&effect, &actor, &service, Utc::now())
        })
        .flat_map(move |entry| sink.record(&entry))
        .fmap(move |recorded| match (recorded, on_failure) {
            (Ok(()), _) => Ok(()),
            (Err(error), AuditFailurePolicy::Block) => Err(InterpreterError::audit(tag, &error)),
            (Err(error), AuditFailurePolicy::LogAndContinue) => {
                tracing::warn!(
                    effect = %tag,
                    error = %error,
                    "audit record failed, continuing"
                );
                Ok(())
            }
        })
    }
}

impl fmt::Debug for AuditPolicy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuditPolicy")
            .field("actor", &self.actor)
            .field("service", &self.service)
            .field("on_failure", &self.on_failure)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TracingAuditSink
// =============================================================================

/// Writes audit entries as `info` events on the `audit` target.
///
/// Route that target to durable storage in the subscriber configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) -> AdapterIO<()> {
        let entry = entry.clone();
        AsyncIO::new(move || async move {
            tracing::info!(
                target: "audit",
                category = %entry.category,
                effect = %entry.effect,
                resource_id = entry.resource_id.as_deref().unwrap_or("-"),
                actor_id = %entry.actor_id,
                service = %entry.service,
                recorded_at = %entry.recorded_at,
                "sensitive effect"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::HealthcareEffect;
    use crate::error::AdapterError;
    use crate::healthcare::PatientId;
    use parking_lot::Mutex;
    use rstest::rstest;

    #[derive(Default)]
    struct FlakySink {
        entries: Mutex<Vec<AuditEntry>>,
        fail: bool,
    }

    impl AuditSink for FlakySink {
        fn record(&self, entry: &AuditEntry) -> AdapterIO<()> {
            if self.fail {
                return AsyncIO::pure(Err(AdapterError::Unavailable("audit db down".into())));
            }
            self.entries.lock().push(entry.clone());
            AsyncIO::pure(Ok(()))
        }
    }

    fn get_patient(patient_id: PatientId) -> Effect {
        Effect::from(HealthcareEffect::GetPatient { patient_id })
    }

    #[rstest]
    fn entry_carries_resource_and_actor() {
        let patient_id = PatientId::new();
        let entry = AuditEntry::for_effect(
            &get_patient(patient_id),
            &Actor::user("dr-who", ["physician"]),
            "clinic",
            Utc::now(),
        );
        assert_eq!(entry.category, EffectCategory::Healthcare);
        assert_eq!(entry.effect, EffectTag::GetPatient);
        assert_eq!(entry.resource_id, Some(patient_id.to_string()));
        assert_eq!(entry.actor_id, "dr-who");
    }

    #[rstest]
    #[case("block", AuditFailurePolicy::Block)]
    #[case("LOG", AuditFailurePolicy::LogAndContinue)]
    #[case(" log_and_continue ", AuditFailurePolicy::LogAndContinue)]
    fn failure_policy_parses(#[case] input: &str, #[case] expected: AuditFailurePolicy) {
        assert_eq!(input.parse::<AuditFailurePolicy>().unwrap(), expected);
    }

    #[rstest]
    fn failure_policy_rejects_unknown_value() {
        assert!("ignore".parse::<AuditFailurePolicy>().is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn guard_records_entry_for_actor() {
        let sink = Arc::new(FlakySink::default());
        let policy = AuditPolicy::new(sink.clone(), "clinic").with_actor(Actor::user("nurse-1", ["nurse"]));

        let verdict = policy.guard(&get_patient(PatientId::nil())).run_async().await;

        assert_eq!(verdict, Ok(()));
        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor_id, "nurse-1");
        assert_eq!(entries[0].service, "clinic");
    }

    #[rstest]
    #[tokio::test]
    async fn entry_is_stamped_when_guard_runs() {
        let sink = Arc::new(FlakySink::default());
        let policy = AuditPolicy::new(sink.clone(), "clinic");

        let pending = policy.guard(&get_patient(PatientId::nil()));
        assert!(sink.entries.lock().is_empty());
        std::thread::sleep(std::time::Duration::from_millis(5));
        let started = Utc::now();
        pending.run_async().await.unwrap();

        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].recorded_at >= started);
    }

    #[rstest]
    #[tokio::test]
    async fn block_turns_sink_failure_into_audit_error() {
        let sink = Arc::new(FlakySink {
            fail: true,
            ..FlakySink::default()
        });
        let policy = AuditPolicy::new(sink, "clinic");

        let verdict = policy.guard(&get_patient(PatientId::nil())).run_async().await;

        assert!(matches!(
            verdict,
            Err(InterpreterError::Audit {
                effect: EffectTag::GetPatient,
                ..
            })
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn log_and_continue_lets_effect_through() {
        let sink = Arc::new(FlakySink {
            fail: true,
            ..FlakySink::default()
        });
        let policy = AuditPolicy::new(sink, "clinic")
            .with_failure_policy(AuditFailurePolicy::LogAndContinue);

        let verdict = policy.guard(&get_patient(PatientId::nil())).run_async().await;

        assert_eq!(verdict, Ok(()));
    }
}
