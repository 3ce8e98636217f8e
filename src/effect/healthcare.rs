//! Clinical record effects.
//!
//! Every operation in this category touches protected health information
//! and is audited before dispatch.

use super::{EffectCategory, EffectTag, Lookup, Operation};
use crate::healthcare::{
    Appointment, AppointmentId, InteractionCheck, Medication, Patient, PatientId,
};
use crate::program::Program;

/// Operations against the clinical record system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthcareEffect {
    /// Resumes with `Lookup<Patient>`.
    GetPatient {
        /// Patient to fetch.
        patient_id: PatientId,
    },
    /// Resumes with `Lookup<Appointment>`.
    GetAppointment {
        /// Appointment to fetch.
        appointment_id: AppointmentId,
    },
    /// Resumes with `()`.
    SaveAppointment {
        /// Appointment in its new state.
        appointment: Appointment,
    },
    /// Resumes with [`InteractionCheck`]; a warning is a domain outcome.
    CheckInteractions {
        /// Patient whose current medication is checked.
        patient_id: PatientId,
        /// Medication about to be prescribed.
        medication: Medication,
    },
}

impl Operation for HealthcareEffect {
    const CATEGORY: EffectCategory = EffectCategory::Healthcare;

    fn tag(&self) -> EffectTag {
        match self {
            Self::GetPatient { .. } => EffectTag::GetPatient,
            Self::GetAppointment { .. } => EffectTag::GetAppointment,
            Self::SaveAppointment { .. } => EffectTag::SaveAppointment,
            Self::CheckInteractions { .. } => EffectTag::CheckInteractions,
        }
    }

    fn resource_id(&self) -> Option<String> {
        Some(match self {
            Self::GetPatient { patient_id } | Self::CheckInteractions { patient_id, .. } => {
                patient_id.to_string()
            }
            Self::GetAppointment { appointment_id } => appointment_id.to_string(),
            Self::SaveAppointment { appointment } => appointment.id().to_string(),
        })
    }
}

/// Yields [`HealthcareEffect::GetPatient`].
#[must_use]
pub fn get_patient(patient_id: PatientId) -> Program<Lookup<Patient>> {
    Program::perform(HealthcareEffect::GetPatient { patient_id })
}

/// Yields [`HealthcareEffect::GetAppointment`].
#[must_use]
pub fn get_appointment(appointment_id: AppointmentId) -> Program<Lookup<Appointment>> {
    Program::perform(HealthcareEffect::GetAppointment { appointment_id })
}

/// Yields [`HealthcareEffect::SaveAppointment`].
#[must_use]
pub fn save_appointment(appointment: Appointment) -> Program<()> {
    Program::perform(HealthcareEffect::SaveAppointment { appointment })
}

/// Yields [`HealthcareEffect::CheckInteractions`].
#[must_use]
pub fn check_interactions(patient_id: PatientId, medication: Medication) -> Program<InteractionCheck> {
    Program::perform(HealthcareEffect::CheckInteractions {
        patient_id,
        medication,
    })
}
