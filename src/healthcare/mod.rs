//! Clinic domain: the worked example built on the engine.
//!
//! - [`Patient`], [`Medication`] and [`InteractionCheck`] are the values the
//!   clinical record effects carry.
//! - [`Appointment`] is a state machine with five states (see
//!   [`appointment`]).
//! - [`programs`] holds business workflows written as [`Program`]s.
//!
//! [`Program`]: crate::program::Program

pub mod appointment;
pub mod programs;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use appointment::{Appointment, AppointmentState, AppointmentStatus};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The all-zero identifier, for fixtures.
            #[must_use]
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(string: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(string).map(Self)
            }
        }
    };
}

uuid_identifier! {
    /// Identifies a patient.
    PatientId
}

uuid_identifier! {
    /// Identifies an appointment.
    AppointmentId
}

uuid_identifier! {
    /// Identifies a practitioner.
    PractitionerId
}

// =============================================================================
// Patient
// =============================================================================

/// A patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Identifier.
    pub id: PatientId,
    /// Full name.
    pub name: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Known allergies, by substance name.
    pub allergies: Vec<String>,
}

// =============================================================================
// Medication / InteractionCheck
// =============================================================================

/// A prescribable medication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Medication {
    /// Formulary code.
    pub code: String,
    /// Display name.
    pub name: String,
}

impl Medication {
    /// Creates a medication.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// How serious an interaction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Monitor the patient.
    Minor,
    /// Adjust dose or timing.
    Moderate,
    /// Do not combine.
    Severe,
}

/// One detected interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionWarning {
    /// Code of the medication already prescribed.
    pub interacts_with: String,
    /// Severity of the interaction.
    pub severity: Severity,
    /// Clinical note.
    pub description: String,
}

/// Outcome of an interaction check. A warning is a domain outcome: the
/// check ran and found something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionCheck {
    /// Nothing found.
    Clear,
    /// At least one interaction found.
    Warning(Vec<InteractionWarning>),
}

impl InteractionCheck {
    /// Builds a check outcome from a list of findings.
    #[must_use]
    pub fn from_warnings(warnings: Vec<InteractionWarning>) -> Self {
        if warnings.is_empty() {
            Self::Clear
        } else {
            Self::Warning(warnings)
        }
    }

    /// The most severe finding, if any.
    #[must_use]
    pub fn highest_severity(&self) -> Option<Severity> {
        match self {
            Self::Clear => None,
            Self::Warning(warnings) => warnings.iter().map(|warning| warning.severity).max(),
        }
    }
}
