//! Appointment lifecycle tests.
//!
//! The transition table is checked exhaustively over every pair of
//! statuses, and random command sequences are checked against the
//! terminal-state invariant.

use chrono::{DateTime, Duration, TimeZone, Utc};
use effectum::healthcare::appointment::AppointmentRejection;
use effectum::healthcare::{
    Appointment, AppointmentId, AppointmentState, AppointmentStatus, PatientId, PractitionerId,
};
use effectum::state_machine::{RejectionReason, StateMachine, allowed_targets, validate_transition};
use proptest::prelude::*;
use rstest::{fixture, rstest};

// =============================================================================
// Fixtures
// =============================================================================

fn clinic_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

fn new_request(at: DateTime<Utc>) -> Appointment {
    Appointment::request(
        AppointmentId::new(),
        PatientId::new(),
        "persistent cough",
        at + Duration::days(2),
        at,
    )
}

#[fixture]
fn now() -> DateTime<Utc> {
    clinic_morning()
}

#[fixture]
fn requested(now: DateTime<Utc>) -> Appointment {
    new_request(now)
}

/// A state of the given status with placeholder data.
fn state_of(status: AppointmentStatus, at: DateTime<Utc>) -> AppointmentState {
    match status {
        AppointmentStatus::Requested => AppointmentState::Requested {
            requested_at: at,
            preferred_start: at,
        },
        AppointmentStatus::Confirmed => AppointmentState::Confirmed {
            confirmed_at: at,
            scheduled_start: at,
            practitioner: PractitionerId::nil(),
        },
        AppointmentStatus::InProgress => AppointmentState::InProgress {
            started_at: at,
            practitioner: PractitionerId::nil(),
        },
        AppointmentStatus::Completed => AppointmentState::Completed {
            completed_at: at,
            summary: String::new(),
        },
        AppointmentStatus::Cancelled => AppointmentState::Cancelled {
            cancelled_at: at,
            reason: String::new(),
        },
    }
}

/// Drives `appointment` into `status` along the table.
fn reach(appointment: &Appointment, status: AppointmentStatus, at: DateTime<Utc>) -> Appointment {
    let path: &[AppointmentStatus] = match status {
        AppointmentStatus::Requested => &[],
        AppointmentStatus::Confirmed => &[AppointmentStatus::Confirmed],
        AppointmentStatus::InProgress => &[AppointmentStatus::Confirmed, AppointmentStatus::InProgress],
        AppointmentStatus::Completed => &[
            AppointmentStatus::Confirmed,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
        ],
        AppointmentStatus::Cancelled => &[AppointmentStatus::Cancelled],
    };
    path.iter().fold(appointment.clone(), |current, next| {
        current.transition(state_of(*next, at)).unwrap()
    })
}

// =============================================================================
// Scenario
// =============================================================================

/// `requested → in_progress` is refused; `requested → confirmed` is taken.
#[rstest]
fn test_requested_cannot_skip_confirmation(requested: Appointment, now: DateTime<Utc>) {
    let rejection = requested.start(now).unwrap_err();
    assert_eq!(rejection.reason(), RejectionReason::InvalidTransition);
    assert_eq!(rejection.reason().as_str(), "invalid_transition");
    assert_eq!(rejection.from(), AppointmentStatus::Requested);
    assert_eq!(rejection.to(), AppointmentStatus::InProgress);
    assert_eq!(requested.status(), AppointmentStatus::Requested);

    let practitioner = PractitionerId::new();
    let confirmed = requested
        .confirm(practitioner, now + Duration::days(2), now)
        .unwrap();
    assert_eq!(confirmed.status(), AppointmentStatus::Confirmed);
    assert_eq!(confirmed.practitioner(), Some(practitioner));
    assert_eq!(confirmed.id(), requested.id());
}

// =============================================================================
// Exhaustive table
// =============================================================================

/// Every `(from, to)` pair is accepted exactly when it is an edge of the
/// table and `from` is not terminal.
#[rstest]
fn test_every_status_pair_against_table(requested: Appointment, now: DateTime<Utc>) {
    for from in AppointmentStatus::ALL {
        let entity = reach(&requested, from, now);
        assert_eq!(entity.status(), from);

        for to in AppointmentStatus::ALL {
            let expected = Appointment::TRANSITIONS.contains(&(from, to));
            let outcome = entity.transition(state_of(to, now));

            assert_eq!(outcome.is_ok(), expected, "{from} -> {to}");
            assert_eq!(
                validate_transition::<Appointment>(from, to).is_ok(),
                expected,
                "{from} -> {to}"
            );
            if let Err(rejection) = outcome {
                let reason = if entity.is_terminal() {
                    RejectionReason::TerminalState
                } else {
                    RejectionReason::InvalidTransition
                };
                assert_eq!(rejection, AppointmentRejection::new(from, to, reason));
            }
        }
    }
}

/// Terminal statuses have no outgoing edges; the others have at least one.
#[rstest]
#[case(AppointmentStatus::Requested, &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled])]
#[case(AppointmentStatus::Confirmed, &[AppointmentStatus::InProgress, AppointmentStatus::Cancelled])]
#[case(AppointmentStatus::InProgress, &[AppointmentStatus::Completed, AppointmentStatus::Cancelled])]
#[case(AppointmentStatus::Completed, &[])]
#[case(AppointmentStatus::Cancelled, &[])]
fn test_allowed_targets(#[case] from: AppointmentStatus, #[case] expected: &[AppointmentStatus]) {
    let targets: Vec<_> = allowed_targets::<Appointment>(from).collect();
    assert_eq!(targets, expected);
}

/// Re-entering a terminal status is a terminal-state rejection, not a
/// no-op.
#[rstest]
fn test_terminal_self_transition_is_rejected(requested: Appointment, now: DateTime<Utc>) {
    let cancelled = requested.cancel("patient request", now).unwrap();

    let rejection = cancelled.cancel("again", now).unwrap_err();

    assert_eq!(rejection.reason(), RejectionReason::TerminalState);
    assert_eq!(
        rejection.to_string(),
        "cannot move from cancelled to cancelled: terminal_state"
    );
}

/// An interrupted consultation may still be cancelled.
#[rstest]
fn test_in_progress_can_be_cancelled(requested: Appointment, now: DateTime<Utc>) {
    let started = reach(&requested, AppointmentStatus::InProgress, now);

    let cancelled = started.cancel("patient left", now).unwrap();

    assert_eq!(cancelled.status(), AppointmentStatus::Cancelled);
    assert!(cancelled.is_terminal());
    assert_eq!(cancelled.practitioner(), None);
}

// =============================================================================
// Properties
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Command {
    Confirm,
    Start,
    Complete,
    Cancel,
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Confirm),
        Just(Command::Start),
        Just(Command::Complete),
        Just(Command::Cancel),
    ]
}

fn apply(
    appointment: &Appointment,
    command: Command,
    at: DateTime<Utc>,
) -> Result<Appointment, AppointmentRejection> {
    match command {
        Command::Confirm => appointment.confirm(PractitionerId::new(), at, at),
        Command::Start => appointment.start(at),
        Command::Complete => appointment.complete("done", at),
        Command::Cancel => appointment.cancel("called off", at),
    }
}

proptest! {
    /// Accepted steps follow table edges, and nothing leaves a terminal
    /// state.
    #[test]
    fn prop_commands_respect_table(commands in prop::collection::vec(command(), 0..24)) {
        let at = clinic_morning();
        let mut current = new_request(at);

        for command in commands {
            let before = current.status();
            match apply(&current, command, at) {
                Ok(next) => {
                    prop_assert!(!current.is_terminal());
                    prop_assert!(Appointment::TRANSITIONS.contains(&(before, next.status())));
                    prop_assert_eq!(next.id(), current.id());
                    current = next;
                }
                Err(rejection) => {
                    prop_assert_eq!(rejection.from(), before);
                    if current.is_terminal() {
                        prop_assert_eq!(rejection.reason(), RejectionReason::TerminalState);
                    } else {
                        prop_assert_eq!(rejection.reason(), RejectionReason::InvalidTransition);
                    }
                }
            }
        }
    }
}
