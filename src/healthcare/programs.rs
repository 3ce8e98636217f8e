//! Clinic workflows written as programs.
//!
//! Each function only builds a [`Program`]; nothing happens until a
//! runner drives it with an interpreter. Domain outcomes (unknown patient,
//! rejected transition, interaction warning) are returned as values, and
//! some of them lead to further effects.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::appointment::AppointmentRejection;
use super::{
    Appointment, AppointmentId, InteractionCheck, InteractionWarning, Medication, Patient,
    PatientId, PractitionerId,
};
use crate::effect::healthcare::{check_interactions, get_appointment, get_patient, save_appointment};
use crate::effect::messaging::publish;
use crate::effect::{Lookup, MessageId, OutboundMessage, cache};
use crate::program::Program;

/// Topic announcing new appointment requests.
pub const APPOINTMENT_REQUESTED_TOPIC: &str = "appointments.requested";
/// Topic announcing appointment state changes.
pub const APPOINTMENT_CHANGED_TOPIC: &str = "appointments.changed";
/// Topic announcing issued prescriptions.
pub const PRESCRIPTION_ISSUED_TOPIC: &str = "prescriptions.issued";
/// Topic for prescriptions that need a pharmacist review.
pub const PRESCRIPTION_FLAGGED_TOPIC: &str = "prescriptions.flagged";

/// Cache key of a patient record.
#[must_use]
pub fn patient_cache_key(patient_id: PatientId) -> String {
    format!("patient:{patient_id}")
}

/// Cache key of a patient's appointment list.
#[must_use]
pub fn appointments_cache_key(patient_id: PatientId) -> String {
    format!("appointments:{patient_id}")
}

// =============================================================================
// patient_summary
// =============================================================================

/// Reads a patient, through the cache.
///
/// A cache hit answers without touching the clinical records. On a miss
/// the patient is fetched and, if found, cached for `time_to_live`. An
/// unknown patient resumes as `Lookup::NotFound`.
pub fn patient_summary(patient_id: PatientId, time_to_live: Duration) -> Program<Lookup<Patient>> {
    let key = patient_cache_key(patient_id);
    cache::get(key.clone()).flat_map(move |cached| {
        match cached.and_then(|value| serde_json::from_value::<Patient>(value).ok()) {
            Some(patient) => Program::pure(Lookup::Found(patient)),
            None => get_patient(patient_id).flat_map(move |lookup| match lookup {
                Lookup::Found(patient) => match serde_json::to_value(&patient) {
                    Ok(value) => {
                        cache::put(key, value, time_to_live).map(move |()| Lookup::Found(patient))
                    }
                    Err(_) => Program::pure(Lookup::Found(patient)),
                },
                Lookup::NotFound { id } => Program::pure(Lookup::NotFound { id }),
            }),
        }
    })
}

// =============================================================================
// request_appointment
// =============================================================================

/// Result of asking for an appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The appointment was stored and announced.
    Requested(Appointment),
    /// No such patient; nothing was stored.
    UnknownPatient(PatientId),
}

/// Stores a new `requested` appointment and announces it.
pub fn request_appointment(
    appointment_id: AppointmentId,
    patient_id: PatientId,
    reason: String,
    preferred_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Program<RequestOutcome> {
    get_patient(patient_id).flat_map(move |lookup| match lookup {
        Lookup::NotFound { .. } => Program::pure(RequestOutcome::UnknownPatient(patient_id)),
        Lookup::Found(patient) => {
            let appointment =
                Appointment::request(appointment_id, patient.id, reason, preferred_start, now);
            let announcement = OutboundMessage::new(
                APPOINTMENT_REQUESTED_TOPIC,
                json!({
                    "appointment_id": appointment_id,
                    "patient_id": patient_id,
                    "preferred_start": preferred_start,
                }),
            )
            .with_correlation_id(appointment_id.to_string());

            save_appointment(appointment.clone())
                .then(publish(announcement))
                .then(cache::invalidate(appointments_cache_key(patient_id)))
                .map(move |()| RequestOutcome::Requested(appointment))
        }
    })
}

// =============================================================================
// advance_appointment
// =============================================================================

/// A requested lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AppointmentCommand {
    /// `requested → confirmed`.
    Confirm {
        /// Assigned practitioner.
        practitioner: PractitionerId,
        /// Agreed start time.
        scheduled_start: DateTime<Utc>,
    },
    /// `confirmed → in_progress`.
    Start,
    /// `in_progress → completed`.
    Complete {
        /// Clinical summary.
        summary: String,
    },
    /// `* → cancelled`.
    Cancel {
        /// Why.
        reason: String,
    },
}

impl AppointmentCommand {
    /// Applies the step to `appointment` at instant `now`.
    ///
    /// # Errors
    ///
    /// Returns the rejection when the step is not allowed from the
    /// appointment's current state.
    pub fn apply(
        self,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentRejection> {
        match self {
            Self::Confirm {
                practitioner,
                scheduled_start,
            } => appointment.confirm(practitioner, scheduled_start, now),
            Self::Start => appointment.start(now),
            Self::Complete { summary } => appointment.complete(summary, now),
            Self::Cancel { reason } => appointment.cancel(reason, now),
        }
    }
}

/// Result of a lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The new state was stored and announced.
    Advanced(Appointment),
    /// The step is not allowed; nothing was stored.
    Rejected(AppointmentRejection),
    /// No such appointment.
    NotFound(AppointmentId),
}

/// Loads an appointment, applies `command`, and on success stores the new
/// state, announces it and drops the patient's cached appointment list.
pub fn advance_appointment(
    appointment_id: AppointmentId,
    command: AppointmentCommand,
    now: DateTime<Utc>,
) -> Program<AdvanceOutcome> {
    get_appointment(appointment_id).flat_map(move |lookup| {
        let appointment = match lookup {
            Lookup::Found(appointment) => appointment,
            Lookup::NotFound { .. } => {
                return Program::pure(AdvanceOutcome::NotFound(appointment_id));
            }
        };
        match command.apply(&appointment, now) {
            Err(rejection) => Program::pure(AdvanceOutcome::Rejected(rejection)),
            Ok(advanced) => {
                let announcement = OutboundMessage::new(
                    APPOINTMENT_CHANGED_TOPIC,
                    json!({
                        "appointment_id": appointment_id,
                        "from": appointment.status(),
                        "to": advanced.status(),
                    }),
                )
                .with_correlation_id(appointment_id.to_string());
                let cache_key = appointments_cache_key(advanced.patient_id());

                save_appointment(advanced.clone())
                    .then(publish(announcement))
                    .then(cache::invalidate(cache_key))
                    .map(move |()| AdvanceOutcome::Advanced(advanced))
            }
        }
    })
}

// =============================================================================
// prescribe
// =============================================================================

/// Result of a prescription attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrescriptionOutcome {
    /// No interaction found; the prescription was issued.
    Issued {
        /// Broker identifier of the announcement.
        message_id: MessageId,
    },
    /// Interactions found; the prescription went to pharmacist review.
    Flagged {
        /// What was found.
        warnings: Vec<InteractionWarning>,
        /// Broker identifier of the review request.
        message_id: MessageId,
    },
    /// The patient is allergic to the medication; nothing was sent.
    Refused {
        /// The matching allergy.
        allergy: String,
    },
    /// No such patient.
    UnknownPatient(PatientId),
}

/// Checks a medication for a patient and issues or flags the prescription.
///
/// An interaction warning is not a failure: the program carries on and
/// routes the prescription to review instead of issuing it.
pub fn prescribe(patient_id: PatientId, medication: Medication) -> Program<PrescriptionOutcome> {
    get_patient(patient_id).flat_map(move |lookup| {
        let patient = match lookup {
            Lookup::Found(patient) => patient,
            Lookup::NotFound { .. } => {
                return Program::pure(PrescriptionOutcome::UnknownPatient(patient_id));
            }
        };
        if let Some(allergy) = patient
            .allergies
            .iter()
            .find(|allergy| allergy.eq_ignore_ascii_case(&medication.name))
        {
            return Program::pure(PrescriptionOutcome::Refused {
                allergy: allergy.clone(),
            });
        }

        check_interactions(patient_id, medication.clone()).flat_map(move |check| match check {
            InteractionCheck::Clear => publish(OutboundMessage::new(
                PRESCRIPTION_ISSUED_TOPIC,
                json!({ "patient_id": patient_id, "medication": medication.code }),
            ))
            .map(|message_id| PrescriptionOutcome::Issued { message_id }),
            InteractionCheck::Warning(warnings) => publish(OutboundMessage::new(
                PRESCRIPTION_FLAGGED_TOPIC,
                json!({
                    "patient_id": patient_id,
                    "medication": medication.code,
                    "warnings": warnings,
                }),
            ))
            .map(move |message_id| PrescriptionOutcome::Flagged {
                warnings,
                message_id,
            }),
        })
    })
}
