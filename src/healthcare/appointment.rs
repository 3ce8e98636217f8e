//! Appointment lifecycle.
//!
//! ```text
//!   requested ──► confirmed ──► in_progress ──► completed
//!       │             │              │
//!       └─────────────┴──────────────┴────────► cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal. Every transition returns a new
//! [`Appointment`]; the original value is left untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AppointmentId, PatientId, PractitionerId};
use crate::state_machine::{RejectionReason, StateMachine, TransitionRejection};

/// Rejection produced by appointment transitions.
pub type AppointmentRejection = TransitionRejection<AppointmentStatus>;

// =============================================================================
// AppointmentStatus
// =============================================================================

/// Payload-free name of an [`AppointmentState`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Asked for by the patient.
    Requested,
    /// Slot and practitioner assigned.
    Confirmed,
    /// Consultation under way.
    InProgress,
    /// Consultation finished.
    Completed,
    /// Called off.
    Cancelled,
}

impl AppointmentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Requested,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// =============================================================================
// AppointmentState
// =============================================================================

/// Current state of an appointment with the data that exists in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AppointmentState {
    /// Waiting for the clinic to confirm.
    Requested {
        /// When the request was made.
        requested_at: DateTime<Utc>,
        /// Start time the patient asked for.
        preferred_start: DateTime<Utc>,
    },
    /// Scheduled with a practitioner.
    Confirmed {
        /// When the clinic confirmed.
        confirmed_at: DateTime<Utc>,
        /// Agreed start time.
        scheduled_start: DateTime<Utc>,
        /// Assigned practitioner.
        practitioner: PractitionerId,
    },
    /// The patient is being seen.
    InProgress {
        /// When the consultation began.
        started_at: DateTime<Utc>,
        /// Practitioner seeing the patient.
        practitioner: PractitionerId,
    },
    /// The consultation is over.
    Completed {
        /// When the consultation ended.
        completed_at: DateTime<Utc>,
        /// Clinical summary.
        summary: String,
    },
    /// The appointment will not take place (or was interrupted).
    Cancelled {
        /// When it was cancelled.
        cancelled_at: DateTime<Utc>,
        /// Why.
        reason: String,
    },
}

impl AppointmentState {
    /// The variant's status tag.
    #[must_use]
    pub const fn status(&self) -> AppointmentStatus {
        match self {
            Self::Requested { .. } => AppointmentStatus::Requested,
            Self::Confirmed { .. } => AppointmentStatus::Confirmed,
            Self::InProgress { .. } => AppointmentStatus::InProgress,
            Self::Completed { .. } => AppointmentStatus::Completed,
            Self::Cancelled { .. } => AppointmentStatus::Cancelled,
        }
    }
}

// =============================================================================
// Appointment
// =============================================================================

/// An appointment of one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    id: AppointmentId,
    patient_id: PatientId,
    reason: String,
    state: AppointmentState,
}

impl StateMachine for Appointment {
    type Tag = AppointmentStatus;

    const TRANSITIONS: &'static [(AppointmentStatus, AppointmentStatus)] = &[
        (AppointmentStatus::Requested, AppointmentStatus::Confirmed),
        (AppointmentStatus::Requested, AppointmentStatus::Cancelled),
        (AppointmentStatus::Confirmed, AppointmentStatus::InProgress),
        (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled),
        (AppointmentStatus::InProgress, AppointmentStatus::Completed),
        (AppointmentStatus::InProgress, AppointmentStatus::Cancelled),
    ];

    const TERMINAL: &'static [AppointmentStatus] =
        &[AppointmentStatus::Completed, AppointmentStatus::Cancelled];

    fn tag(&self) -> AppointmentStatus {
        self.state.status()
    }
}

impl Appointment {
    /// Creates an appointment in the `requested` state.
    #[must_use]
    pub fn request(
        id: AppointmentId,
        patient_id: PatientId,
        reason: impl Into<String>,
        preferred_start: DateTime<Utc>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            patient_id,
            reason: reason.into(),
            state: AppointmentState::Requested {
                requested_at,
                preferred_start,
            },
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> AppointmentId {
        self.id
    }

    /// The patient the appointment is for.
    #[must_use]
    pub const fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    /// Why the patient asked for it.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &AppointmentState {
        &self.state
    }

    /// Current status tag.
    #[must_use]
    pub const fn status(&self) -> AppointmentStatus {
        self.state.status()
    }

    /// Practitioner assigned, in the states that have one.
    #[must_use]
    pub const fn practitioner(&self) -> Option<PractitionerId> {
        match &self.state {
            AppointmentState::Confirmed { practitioner, .. }
            | AppointmentState::InProgress { practitioner, .. } => Some(*practitioner),
            AppointmentState::Requested { .. }
            | AppointmentState::Completed { .. }
            | AppointmentState::Cancelled { .. } => None,
        }
    }

    /// Moves to `target`, returning the appointment in its new state.
    ///
    /// # Errors
    ///
    /// Returns the rejection when the edge is not allowed or the
    /// appointment is already terminal.
    pub fn transition(&self, target: AppointmentState) -> Result<Self, AppointmentRejection> {
        self.can_transition_to(target.status())?;
        Ok(Self {
            id: self.id,
            patient_id: self.patient_id,
            reason: self.reason.clone(),
            state: target,
        })
    }

    /// `requested → confirmed`.
    ///
    /// # Errors
    ///
    /// See [`Appointment::transition`].
    pub fn confirm(
        &self,
        practitioner: PractitionerId,
        scheduled_start: DateTime<Utc>,
        confirmed_at: DateTime<Utc>,
    ) -> Result<Self, AppointmentRejection> {
        self.transition(AppointmentState::Confirmed {
            confirmed_at,
            scheduled_start,
            practitioner,
        })
    }

    /// `confirmed → in_progress`, keeping the confirmed practitioner.
    ///
    /// # Errors
    ///
    /// See [`Appointment::transition`].
    pub fn start(&self, started_at: DateTime<Utc>) -> Result<Self, AppointmentRejection> {
        let target = AppointmentStatus::InProgress;
        self.can_transition_to(target)?;
        let practitioner = self.practitioner().ok_or_else(|| {
            TransitionRejection::new(self.status(), target, RejectionReason::InvalidTransition)
        })?;
        self.transition(AppointmentState::InProgress {
            started_at,
            practitioner,
        })
    }

    /// `in_progress → completed`.
    ///
    /// # Errors
    ///
    /// See [`Appointment::transition`].
    pub fn complete(
        &self,
        summary: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AppointmentRejection> {
        self.transition(AppointmentState::Completed {
            completed_at,
            summary: summary.into(),
        })
    }

    /// Any non-terminal state `→ cancelled`.
    ///
    /// # Errors
    ///
    /// See [`Appointment::transition`].
    pub fn cancel(
        &self,
        reason: impl Into<String>,
        cancelled_at: DateTime<Utc>,
    ) -> Result<Self, AppointmentRejection> {
        self.transition(AppointmentState::Cancelled {
            cancelled_at,
            reason: reason.into(),
        })
    }
}
