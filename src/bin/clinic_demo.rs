//! Clinic demo.
//!
//! Wires the in-memory collaborators into a composite interpreter and
//! drives the healthcare programs: a cached patient lookup, an appointment
//! through its lifecycle (with rejected steps), and three prescriptions.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use effectum::audit::{Actor, AuditPolicy};
use effectum::config::EngineConfig;
use effectum::effect::{EffectTag, Lookup};
use effectum::healthcare::programs::{
    AdvanceOutcome, AppointmentCommand, PrescriptionOutcome, RequestOutcome, advance_appointment,
    patient_summary, prescribe, request_appointment,
};
use effectum::healthcare::{
    AppointmentId, Medication, Patient, PatientId, PractitionerId, Severity,
};
use effectum::memory::{InMemoryBackends, InMemoryClinicalRecords};
use effectum::metrics::{EFFECTS_TOTAL, EffectMetrics, LabelRegistry};
use effectum::runner::ProgramRunner;
use effectum::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env()?;
    init_tracing(&config)?;

    tracing::info!(service = %config.service_name, "starting clinic demo");

    let patient = Patient {
        id: PatientId::new(),
        name: "Grace Hopper".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1906, 12, 9)
            .ok_or_else(|| anyhow::anyhow!("invalid date of birth"))?,
        allergies: vec!["Penicillin".to_string()],
    };
    let backends = InMemoryBackends::new().with_clinical(
        InMemoryClinicalRecords::new()
            .with_patient(patient.clone())
            .with_prescription(patient.id, Medication::new("B01AA03", "Warfarin"))
            .with_interaction("B01AA03", "N02BA01", Severity::Severe, "bleeding risk"),
    );

    let registry = Arc::new(LabelRegistry::standard());
    let metrics = Arc::new(EffectMetrics::new(registry));
    let mut builder = backends.composite().with_audit(
        AuditPolicy::new(Arc::new(backends.audit.clone()), config.service_name.clone())
            .with_failure_policy(config.audit_failure_policy),
    );
    if config.metrics_enabled {
        builder = builder.with_metrics(Arc::clone(&metrics));
    }
    let interpreter = builder
        .build()
        .with_actor(Actor::user("dr-hopper", ["physician"]));
    let runner = ProgramRunner::new(interpreter);

    for attempt in 1..=2 {
        let lookup = runner
            .run(patient_summary(patient.id, config.cache_ttl))
            .await?;
        tracing::info!(attempt, found = lookup.is_found(), "patient summary");
    }

    let now = Utc::now();
    let appointment_id = AppointmentId::new();
    let requested = runner
        .run(request_appointment(
            appointment_id,
            patient.id,
            "annual check-up".to_string(),
            now + ChronoDuration::days(3),
            now,
        ))
        .await?;
    if let RequestOutcome::Requested(appointment) = &requested {
        tracing::info!(appointment_id = %appointment.id(), status = %appointment.status(), "appointment requested");
    }

    let commands = [
        AppointmentCommand::Start,
        AppointmentCommand::Confirm {
            practitioner: PractitionerId::new(),
            scheduled_start: now + ChronoDuration::days(3),
        },
        AppointmentCommand::Start,
        AppointmentCommand::Complete {
            summary: "healthy".to_string(),
        },
        AppointmentCommand::Cancel {
            reason: "too late".to_string(),
        },
    ];
    for command in commands {
        let execution = runner
            .execute(advance_appointment(appointment_id, command, Utc::now()))
            .await;
        match execution.outcome? {
            AdvanceOutcome::Advanced(appointment) => {
                tracing::info!(status = %appointment.status(), steps = execution.trace.len(), "appointment advanced");
            }
            AdvanceOutcome::Rejected(rejection) => {
                tracing::info!(reason = %rejection.reason().as_str(), %rejection, "step rejected");
            }
            AdvanceOutcome::NotFound(id) => tracing::warn!(appointment_id = %id, "appointment missing"),
        }
    }

    for medication in [
        Medication::new("N02BE01", "Paracetamol"),
        Medication::new("N02BA01", "Aspirin"),
        Medication::new("J01CA04", "Penicillin"),
    ] {
        let name = medication.name.clone();
        match runner.run(prescribe(patient.id, medication)).await? {
            PrescriptionOutcome::Issued { message_id } => {
                tracing::info!(medication = %name, %message_id, "prescription issued");
            }
            PrescriptionOutcome::Flagged { warnings, .. } => {
                tracing::info!(medication = %name, warnings = warnings.len(), "prescription flagged");
            }
            PrescriptionOutcome::Refused { allergy } => {
                tracing::info!(medication = %name, %allergy, "prescription refused");
            }
            PrescriptionOutcome::UnknownPatient(id) => tracing::warn!(patient_id = %id, "unknown patient"),
        }
    }

    let unknown = runner
        .run(patient_summary(PatientId::new(), config.cache_ttl))
        .await?;
    if let Lookup::NotFound { id } = unknown {
        tracing::info!(patient_id = %id, "lookup of unknown patient returned not_found");
    }

    tracing::info!(
        audit_entries = backends.audit.entries().len(),
        published = backends.broker.published().len(),
        effects = metrics.total(EFFECTS_TOTAL),
        patient_reads = metrics.count(
            EFFECTS_TOTAL,
            &[
                ("category", "healthcare"),
                ("effect", EffectTag::GetPatient.as_str()),
                ("outcome", "ok"),
            ],
        ),
        "clinic demo finished"
    );
    Ok(())
}
