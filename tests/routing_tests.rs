//! Composite routing tests.
//!
//! Every effect must reach the interpreter registered for its category and
//! no other; a category without an interpreter is a defect.

use std::sync::Arc;
use std::time::Duration;

use effectum::effect::{
    CacheEffect, Effect, EffectCategory, EffectReturn, EffectTag, EffectValue, HealthcareEffect,
    IdentityEffect, MessagingEffect, ObjectLocation, Operation, PersistenceEffect, RecordId,
    StorageEffect, Token,
};
use effectum::error::{DefectReason, InterpreterError};
use effectum::healthcare::PatientId;
use effectum::interpreter::{CompositeInterpreter, FnInterpreter, Interpret, Interpretation};
use effectum::io::AsyncIO;
use parking_lot::Mutex;
use rstest::{fixture, rstest};
use serde_json::json;

// =============================================================================
// Fixtures
// =============================================================================

type Seen = Arc<Mutex<Vec<EffectCategory>>>;

#[fixture]
fn seen() -> Seen {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records its category and acknowledges with `Unit`.
fn recording<E: Operation + Send + 'static>(
    seen: &Seen,
) -> FnInterpreter<E, impl Fn(E) -> Interpretation + Send + Sync + use<E>> {
    let seen = Arc::clone(seen);
    FnInterpreter::new(move |effect: E| {
        seen.lock().push(E::CATEGORY);
        AsyncIO::pure(Ok(EffectReturn::new(effect.tag(), EffectValue::Unit)))
    })
}

fn fully_wired(seen: &Seen) -> CompositeInterpreter {
    CompositeInterpreter::builder()
        .with_persistence(recording::<PersistenceEffect>(seen))
        .with_cache(recording::<CacheEffect>(seen))
        .with_messaging(recording::<MessagingEffect>(seen))
        .with_storage(recording::<StorageEffect>(seen))
        .with_identity(recording::<IdentityEffect>(seen))
        .with_healthcare(recording::<HealthcareEffect>(seen))
        .build()
}

fn sample(category: EffectCategory) -> Effect {
    match category {
        EffectCategory::Persistence => PersistenceEffect::GetRecord {
            id: RecordId::new("r-1"),
        }
        .into(),
        EffectCategory::Cache => CacheEffect::Put {
            key: "k".to_string(),
            value: json!({"hits": 1}),
            time_to_live: Duration::from_secs(60),
        }
        .into(),
        EffectCategory::Messaging => MessagingEffect::Consume {
            queue: "inbox".to_string(),
        }
        .into(),
        EffectCategory::Storage => StorageEffect::GetObject {
            location: ObjectLocation::new("scans", "2026/10/ct.dcm"),
        }
        .into(),
        EffectCategory::Identity => IdentityEffect::RevokeToken {
            token: Token::new("opaque"),
        }
        .into(),
        EffectCategory::Healthcare => HealthcareEffect::GetPatient {
            patient_id: PatientId::new(),
        }
        .into(),
    }
}

const EVERY_TAG: [EffectTag; 25] = [
    EffectTag::GetRecord,
    EffectTag::SaveRecord,
    EffectTag::DeleteRecord,
    EffectTag::ListRecords,
    EffectTag::CacheGet,
    EffectTag::CachePut,
    EffectTag::CacheInvalidate,
    EffectTag::Publish,
    EffectTag::Consume,
    EffectTag::Acknowledge,
    EffectTag::NegativeAcknowledge,
    EffectTag::PutObject,
    EffectTag::GetObject,
    EffectTag::DeleteObject,
    EffectTag::ListObjects,
    EffectTag::ValidateToken,
    EffectTag::GenerateToken,
    EffectTag::RefreshToken,
    EffectTag::RevokeToken,
    EffectTag::HashPassword,
    EffectTag::VerifyPassword,
    EffectTag::GetPatient,
    EffectTag::GetAppointment,
    EffectTag::SaveAppointment,
    EffectTag::CheckInteractions,
];

// =============================================================================
// Routing
// =============================================================================

/// An effect reaches exactly the interpreter of its category.
#[rstest]
#[case::persistence(EffectCategory::Persistence)]
#[case::cache(EffectCategory::Cache)]
#[case::messaging(EffectCategory::Messaging)]
#[case::storage(EffectCategory::Storage)]
#[case::identity(EffectCategory::Identity)]
#[case::healthcare(EffectCategory::Healthcare)]
#[tokio::test]
async fn test_effect_routes_only_to_its_category(seen: Seen, #[case] category: EffectCategory) {
    let interpreter = fully_wired(&seen);
    let effect = sample(category);
    let tag = effect.tag();

    let returned = interpreter.interpret(effect).run_async().await.unwrap();

    assert_eq!(returned.tag(), tag);
    assert_eq!(*seen.lock(), vec![category]);
}

/// Removing one category leaves the others routable and turns that
/// category into a defect.
#[rstest]
#[tokio::test]
async fn test_missing_category_is_defect_while_others_route(seen: Seen) {
    let interpreter = CompositeInterpreter::builder()
        .with_persistence(recording::<PersistenceEffect>(&seen))
        .with_cache(recording::<CacheEffect>(&seen))
        .build();

    assert!(interpreter.handles(EffectCategory::Cache));
    assert!(!interpreter.handles(EffectCategory::Storage));

    let error = interpreter
        .interpret(sample(EffectCategory::Storage))
        .run_async()
        .await
        .unwrap_err();
    assert_eq!(
        error,
        InterpreterError::Defect {
            effect: EffectTag::GetObject,
            reason: DefectReason::NoHandler,
        }
    );
    assert!(error.is_defect());
    assert!(!error.is_retryable());

    interpreter
        .interpret(sample(EffectCategory::Cache))
        .run_async()
        .await
        .unwrap();
    assert_eq!(*seen.lock(), vec![EffectCategory::Cache]);
}

/// Nothing is registered: every category is a defect.
#[rstest]
#[tokio::test]
async fn test_empty_composite_rejects_every_category() {
    let interpreter = CompositeInterpreter::builder().build();

    for category in EffectCategory::ALL {
        let outcome = interpreter.interpret(sample(category)).run_async().await;
        assert!(
            matches!(outcome, Err(InterpreterError::Defect { .. })),
            "{category} should be a defect"
        );
    }
}

// =============================================================================
// Tag classification
// =============================================================================

/// Only healthcare operations carry regulated data.
#[rstest]
fn test_only_healthcare_tags_are_sensitive() {
    for tag in EVERY_TAG {
        assert_eq!(
            tag.is_sensitive(),
            tag.category() == EffectCategory::Healthcare,
            "{tag}"
        );
    }
}

/// Every category owns at least one operation.
#[rstest]
fn test_every_category_owns_a_tag() {
    for category in EffectCategory::ALL {
        assert!(EVERY_TAG.iter().any(|tag| tag.category() == category));
    }
}

/// The sample effect of each category reports that category.
#[rstest]
fn test_sample_effects_report_their_category() {
    for category in EffectCategory::ALL {
        let effect = sample(category);
        assert_eq!(effect.category(), category);
        assert_eq!(effect.tag().category(), category);
    }
}
