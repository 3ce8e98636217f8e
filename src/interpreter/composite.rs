//! Routing interpreter with audit and metrics around every dispatch.

use std::fmt;
use std::sync::Arc;

use super::{Interpret, Interpretation};
use crate::audit::{Actor, AuditPolicy, TracingAuditSink};
use crate::effect::{
    CacheEffect, Effect, EffectCategory, HealthcareEffect, IdentityEffect, MessagingEffect,
    Operation, PersistenceEffect, StorageEffect,
};
use crate::error::{DefectReason, InterpreterError};
use crate::io::AsyncIO;
use crate::metrics::{EffectMetrics, Outcome};

/// Service name used when no audit policy is configured.
const DEFAULT_SERVICE: &str = "effectum";

type Handler<E> = Option<Arc<dyn Interpret<E>>>;

/// One optional handler per category.
///
/// `dispatch` matches on [`Effect`] without a wildcard arm, so a new
/// category does not compile until it has a slot here.
#[derive(Default)]
struct Routes {
    persistence: Handler<PersistenceEffect>,
    cache: Handler<CacheEffect>,
    messaging: Handler<MessagingEffect>,
    storage: Handler<StorageEffect>,
    identity: Handler<IdentityEffect>,
    healthcare: Handler<HealthcareEffect>,
}

impl Routes {
    fn dispatch(&self, effect: Effect) -> Interpretation {
        match effect {
            Effect::Persistence(effect) => route(self.persistence.as_deref(), effect),
            Effect::Cache(effect) => route(self.cache.as_deref(), effect),
            Effect::Messaging(effect) => route(self.messaging.as_deref(), effect),
            Effect::Storage(effect) => route(self.storage.as_deref(), effect),
            Effect::Identity(effect) => route(self.identity.as_deref(), effect),
            Effect::Healthcare(effect) => route(self.healthcare.as_deref(), effect),
        }
    }

    const fn handles(&self, category: EffectCategory) -> bool {
        match category {
            EffectCategory::Persistence => self.persistence.is_some(),
            EffectCategory::Cache => self.cache.is_some(),
            EffectCategory::Messaging => self.messaging.is_some(),
            EffectCategory::Storage => self.storage.is_some(),
            EffectCategory::Identity => self.identity.is_some(),
            EffectCategory::Healthcare => self.healthcare.is_some(),
        }
    }
}

fn route<E: Operation>(handler: Option<&dyn Interpret<E>>, effect: E) -> Interpretation {
    match handler {
        Some(handler) => handler.interpret(effect),
        None => {
            let tag = effect.tag();
            tracing::error!(
                effect = %tag,
                category = %E::CATEGORY,
                "no interpreter registered for effect category"
            );
            AsyncIO::pure(Err(InterpreterError::defect(tag, DefectReason::NoHandler)))
        }
    }
}

// =============================================================================
// CompositeInterpreter
// =============================================================================

/// Routes every [`Effect`] to the interpreter registered for its category.
///
/// Before dispatching an effect classified as sensitive
/// ([`EffectTag::is_sensitive`](crate::effect::EffectTag::is_sensitive)),
/// the interpreter runs its [`AuditPolicy`]. When the policy blocks, the
/// specialized interpreter is never called. When metrics are enabled the
/// outcome of every effect is counted in `effects_total`.
///
/// An effect whose category has no registered interpreter fails with
/// [`InterpreterError::Defect`] and [`DefectReason::NoHandler`].
///
/// Cloning is cheap: the routing table is shared.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use effectum::interpreter::{CacheInterpreter, CompositeInterpreter};
/// use effectum::memory::InMemoryCache;
///
/// let interpreter = CompositeInterpreter::builder()
///     .with_cache(CacheInterpreter::new(Arc::new(InMemoryCache::new())))
///     .build();
/// assert!(interpreter.handles(effectum::effect::EffectCategory::Cache));
/// ```
#[derive(Clone)]
pub struct CompositeInterpreter {
    routes: Arc<Routes>,
    audit: AuditPolicy,
    metrics: Option<Arc<EffectMetrics>>,
}

impl CompositeInterpreter {
    /// Starts an empty routing table.
    #[must_use]
    pub fn builder() -> CompositeInterpreterBuilder {
        CompositeInterpreterBuilder::default()
    }

    /// The same routes and policies, auditing on behalf of `actor`.
    ///
    /// Intended for one clone per request.
    #[must_use]
    pub fn with_actor(&self, actor: Actor) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            audit: self.audit.clone().with_actor(actor),
            metrics: self.metrics.clone(),
        }
    }

    /// Returns `true` if an interpreter is registered for `category`.
    #[must_use]
    pub fn handles(&self, category: EffectCategory) -> bool {
        self.routes.handles(category)
    }

    /// The audit policy applied to sensitive effects.
    #[must_use]
    pub const fn audit_policy(&self) -> &AuditPolicy {
        &self.audit
    }

    /// The metrics sink, when enabled.
    #[must_use]
    pub fn metrics(&self) -> Option<&EffectMetrics> {
        self.metrics.as_deref()
    }
}

impl Interpret<Effect> for CompositeInterpreter {
    fn interpret(&self, effect: Effect) -> Interpretation {
        let tag = effect.tag();
        tracing::trace!(
            effect = %tag,
            category = %tag.category(),
            sensitive = tag.is_sensitive(),
            "routing effect"
        );

        let dispatched = if tag.is_sensitive() {
            let routes = Arc::clone(&self.routes);
            self.audit
                .guard(&effect)
                .flat_map(move |verdict| match verdict {
                    Ok(()) => routes.dispatch(effect),
                    Err(error) => AsyncIO::pure(Err(error)),
                })
        } else {
            self.routes.dispatch(effect)
        };

        match &self.metrics {
            Some(metrics) => {
                let metrics = Arc::clone(metrics);
                dispatched.fmap(move |result| {
                    metrics.observe(tag, Outcome::of(&result));
                    result
                })
            }
            None => dispatched,
        }
    }
}

impl fmt::Debug for CompositeInterpreter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<EffectCategory> = EffectCategory::ALL
            .into_iter()
            .filter(|category| self.routes.handles(*category))
            .collect();
        formatter
            .debug_struct("CompositeInterpreter")
            .field("registered", &registered)
            .field("audit", &self.audit)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

// =============================================================================
// CompositeInterpreterBuilder
// =============================================================================

/// Builder for [`CompositeInterpreter`].
///
/// Categories left unregistered produce defects at runtime. Without
/// [`with_audit`](Self::with_audit), sensitive effects are audited through
/// [`TracingAuditSink`] with the `block` failure policy.
#[derive(Default)]
pub struct CompositeInterpreterBuilder {
    routes: Routes,
    audit: Option<AuditPolicy>,
    metrics: Option<Arc<EffectMetrics>>,
}

impl CompositeInterpreterBuilder {
    /// Registers the persistence interpreter.
    #[must_use]
    pub fn with_persistence(mut self, interpreter: impl Interpret<PersistenceEffect> + 'static) -> Self {
        self.routes.persistence = Some(Arc::new(interpreter));
        self
    }

    /// Registers the cache interpreter.
    #[must_use]
    pub fn with_cache(mut self, interpreter: impl Interpret<CacheEffect> + 'static) -> Self {
        self.routes.cache = Some(Arc::new(interpreter));
        self
    }

    /// Registers the messaging interpreter.
    #[must_use]
    pub fn with_messaging(mut self, interpreter: impl Interpret<MessagingEffect> + 'static) -> Self {
        self.routes.messaging = Some(Arc::new(interpreter));
        self
    }

    /// Registers the object storage interpreter.
    #[must_use]
    pub fn with_storage(mut self, interpreter: impl Interpret<StorageEffect> + 'static) -> Self {
        self.routes.storage = Some(Arc::new(interpreter));
        self
    }

    /// Registers the identity interpreter.
    #[must_use]
    pub fn with_identity(mut self, interpreter: impl Interpret<IdentityEffect> + 'static) -> Self {
        self.routes.identity = Some(Arc::new(interpreter));
        self
    }

    /// Registers the healthcare interpreter.
    #[must_use]
    pub fn with_healthcare(mut self, interpreter: impl Interpret<HealthcareEffect> + 'static) -> Self {
        self.routes.healthcare = Some(Arc::new(interpreter));
        self
    }

    /// Replaces the default audit policy.
    #[must_use]
    pub fn with_audit(mut self, audit: AuditPolicy) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Counts effect outcomes in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<EffectMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Freezes the routing table.
    #[must_use]
    pub fn build(self) -> CompositeInterpreter {
        CompositeInterpreter {
            routes: Arc::new(self.routes),
            audit: self
                .audit
                .unwrap_or_else(|| AuditPolicy::new(Arc::new(TracingAuditSink), DEFAULT_SERVICE)),
            metrics: self.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEntry, AuditFailurePolicy};
    use crate::effect::{EffectReturn, EffectTag, EffectValue, RecordId};
    use crate::error::AdapterError;
    use crate::healthcare::PatientId;
    use crate::interpreter::FnInterpreter;
    use crate::metrics::{EFFECTS_TOTAL, LabelRegistry};
    use crate::ports::{AdapterIO, AuditSink};
    use parking_lot::Mutex;
    use rstest::{fixture, rstest};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Sink {
        entries: Mutex<Vec<AuditEntry>>,
        fail: bool,
    }

    impl AuditSink for Sink {
        fn record(&self, entry: &AuditEntry) -> AdapterIO<()> {
            if self.fail {
                return AsyncIO::pure(Err(AdapterError::Unavailable("down".into())));
            }
            self.entries.lock().push(entry.clone());
            AsyncIO::pure(Ok(()))
        }
    }

    fn counting<E: Operation + 'static>(
        calls: &Arc<AtomicUsize>,
        value: EffectValue,
    ) -> FnInterpreter<E, impl Fn(E) -> Interpretation + Send + Sync + use<E>> {
        let calls = Arc::clone(calls);
        FnInterpreter::new(move |effect: E| {
            calls.fetch_add(1, Ordering::SeqCst);
            AsyncIO::pure(Ok(EffectReturn::new(effect.tag(), value.clone())))
        })
    }

    #[fixture]
    fn calls() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn get_patient() -> Effect {
        HealthcareEffect::GetPatient {
            patient_id: PatientId::nil(),
        }
        .into()
    }

    #[rstest]
    #[tokio::test]
    async fn unregistered_category_is_defect(calls: Arc<AtomicUsize>) {
        let interpreter = CompositeInterpreter::builder()
            .with_cache(counting::<CacheEffect>(&calls, EffectValue::Unit))
            .build();

        let error = interpreter
            .interpret(
                PersistenceEffect::DeleteRecord {
                    id: RecordId::new("r"),
                }
                .into(),
            )
            .run_async()
            .await
            .unwrap_err();

        assert_eq!(
            error,
            InterpreterError::defect(EffectTag::DeleteRecord, DefectReason::NoHandler)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn sensitive_effect_is_audited_before_dispatch(calls: Arc<AtomicUsize>) {
        let sink = Arc::new(Sink::default());
        let interpreter = CompositeInterpreter::builder()
            .with_healthcare(counting::<HealthcareEffect>(&calls, EffectValue::Unit))
            .with_audit(AuditPolicy::new(sink.clone(), "clinic"))
            .build()
            .with_actor(Actor::user("dr-1", ["physician"]));

        interpreter.interpret(get_patient()).run_async().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor_id, "dr-1");
        assert_eq!(entries[0].resource_id, Some(PatientId::nil().to_string()));
    }

    #[rstest]
    #[tokio::test]
    async fn blocked_audit_never_reaches_interpreter(calls: Arc<AtomicUsize>) {
        let sink = Arc::new(Sink {
            fail: true,
            ..Sink::default()
        });
        let interpreter = CompositeInterpreter::builder()
            .with_healthcare(counting::<HealthcareEffect>(&calls, EffectValue::Unit))
            .with_audit(AuditPolicy::new(sink, "clinic"))
            .build();

        let error = interpreter.interpret(get_patient()).run_async().await.unwrap_err();

        assert!(matches!(error, InterpreterError::Audit { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn tolerated_audit_failure_dispatches(calls: Arc<AtomicUsize>) {
        let sink = Arc::new(Sink {
            fail: true,
            ..Sink::default()
        });
        let interpreter = CompositeInterpreter::builder()
            .with_healthcare(counting::<HealthcareEffect>(&calls, EffectValue::Unit))
            .with_audit(
                AuditPolicy::new(sink, "clinic")
                    .with_failure_policy(AuditFailurePolicy::LogAndContinue),
            )
            .build();

        interpreter.interpret(get_patient()).run_async().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn non_sensitive_effect_skips_audit(calls: Arc<AtomicUsize>) {
        let sink = Arc::new(Sink::default());
        let interpreter = CompositeInterpreter::builder()
            .with_cache(counting::<CacheEffect>(&calls, EffectValue::Unit))
            .with_audit(AuditPolicy::new(sink.clone(), "clinic"))
            .build();

        interpreter
            .interpret(CacheEffect::Invalidate { key: "k".into() }.into())
            .run_async()
            .await
            .unwrap();

        assert!(sink.entries.lock().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn outcomes_are_counted(calls: Arc<AtomicUsize>) {
        let metrics = Arc::new(EffectMetrics::new(Arc::new(LabelRegistry::standard())));
        let interpreter = CompositeInterpreter::builder()
            .with_cache(counting::<CacheEffect>(&calls, EffectValue::Unit))
            .with_metrics(metrics.clone())
            .build();

        interpreter
            .interpret(CacheEffect::Invalidate { key: "k".into() }.into())
            .run_async()
            .await
            .unwrap();
        let _ = interpreter
            .interpret(
                PersistenceEffect::DeleteRecord {
                    id: RecordId::new("r"),
                }
                .into(),
            )
            .run_async()
            .await;

        assert_eq!(
            metrics.count(
                EFFECTS_TOTAL,
                &[
                    ("category", "cache"),
                    ("effect", EffectTag::CacheInvalidate.as_str()),
                    ("outcome", "ok"),
                ],
            ),
            1
        );
        assert_eq!(
            metrics.count(
                EFFECTS_TOTAL,
                &[
                    ("category", "persistence"),
                    ("effect", EffectTag::DeleteRecord.as_str()),
                    ("outcome", "defect"),
                ],
            ),
            1
        );
    }

    #[rstest]
    fn debug_lists_registered_categories(calls: Arc<AtomicUsize>) {
        let interpreter = CompositeInterpreter::builder()
            .with_cache(counting::<CacheEffect>(&calls, EffectValue::Unit))
            .build();
        let rendered = format!("{interpreter:?}");
        assert!(rendered.contains("Cache"));
        assert!(!rendered.contains("Persistence"));
    }
}
