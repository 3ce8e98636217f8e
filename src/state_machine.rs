//! Workflow entities as validated state machines.
//!
//! An entity holds exactly one state variant, each carrying only the data
//! meaningful in that state. Moves between variants are checked against an
//! explicit table of allowed `(from, to)` edges; terminal states reject
//! every move. Validation is pure: no I/O, no authorization. Those are
//! effects composed around it by the calling program.
//!
//! # Examples
//!
//! ```rust
//! use std::fmt;
//! use effectum::state_machine::{RejectionReason, StateMachine, validate_transition};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Door { Open, Closed, Welded }
//!
//! impl fmt::Display for Door {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         fmt::Debug::fmt(self, f)
//!     }
//! }
//!
//! struct Hatch(Door);
//!
//! impl StateMachine for Hatch {
//!     type Tag = Door;
//!     const TRANSITIONS: &'static [(Door, Door)] =
//!         &[(Door::Open, Door::Closed), (Door::Closed, Door::Open), (Door::Closed, Door::Welded)];
//!     const TERMINAL: &'static [Door] = &[Door::Welded];
//!
//!     fn tag(&self) -> Door {
//!         self.0
//!     }
//! }
//!
//! assert!(validate_transition::<Hatch>(Door::Open, Door::Closed).is_ok());
//! let rejection = validate_transition::<Hatch>(Door::Welded, Door::Open).unwrap_err();
//! assert_eq!(rejection.reason(), RejectionReason::TerminalState);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A workflow entity whose state moves along a fixed table of edges.
pub trait StateMachine {
    /// Payload-free name of a state variant.
    type Tag: Copy + Eq + fmt::Debug + fmt::Display + 'static;

    /// Every allowed `(from, to)` edge. Pairs not listed are rejected.
    const TRANSITIONS: &'static [(Self::Tag, Self::Tag)];

    /// States that reject every transition.
    const TERMINAL: &'static [Self::Tag];

    /// The tag of the current state.
    fn tag(&self) -> Self::Tag;

    /// Returns `true` once the entity has reached a terminal state.
    fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(&self.tag())
    }

    /// Checks a move from the current state to `target`.
    ///
    /// # Errors
    ///
    /// See [`validate_transition`].
    fn can_transition_to(&self, target: Self::Tag) -> Result<(), TransitionRejection<Self::Tag>> {
        validate_transition::<Self>(self.tag(), target)
    }
}

/// Checks a `(from, to)` move against `M`'s table.
///
/// # Errors
///
/// - [`RejectionReason::TerminalState`] when `from` is terminal, whatever
///   `to` is.
/// - [`RejectionReason::InvalidTransition`] when the edge is not listed.
pub fn validate_transition<M>(from: M::Tag, to: M::Tag) -> Result<(), TransitionRejection<M::Tag>>
where
    M: StateMachine + ?Sized,
{
    if M::TERMINAL.contains(&from) {
        return Err(TransitionRejection::new(from, to, RejectionReason::TerminalState));
    }
    if M::TRANSITIONS.contains(&(from, to)) {
        Ok(())
    } else {
        Err(TransitionRejection::new(
            from,
            to,
            RejectionReason::InvalidTransition,
        ))
    }
}

/// Targets reachable in one step from `from`, in table order.
pub fn allowed_targets<M>(from: M::Tag) -> impl Iterator<Item = M::Tag>
where
    M: StateMachine + ?Sized,
{
    let terminal = M::TERMINAL.contains(&from);
    M::TRANSITIONS
        .iter()
        .filter(move |(source, _)| !terminal && *source == from)
        .map(|(_, target)| *target)
}

// =============================================================================
// Rejection
// =============================================================================

/// Machine-readable reason a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// The edge is not in the transition table.
    InvalidTransition,
    /// The current state is terminal.
    TerminalState,
}

impl RejectionReason {
    /// Stable identifier: `invalid_transition` or `terminal_state`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTransition => "invalid_transition",
            Self::TerminalState => "terminal_state",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A refused transition. This is a domain outcome, not an infrastructure
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRejection<T> {
    from: T,
    to: T,
    reason: RejectionReason,
}

impl<T: Copy> TransitionRejection<T> {
    /// Creates a rejection.
    #[must_use]
    pub const fn new(from: T, to: T, reason: RejectionReason) -> Self {
        Self { from, to, reason }
    }

    /// State the entity was in.
    #[must_use]
    pub const fn from(&self) -> T {
        self.from
    }

    /// State that was requested.
    #[must_use]
    pub const fn to(&self) -> T {
        self.to
    }

    /// Why the move was refused.
    #[must_use]
    pub const fn reason(&self) -> RejectionReason {
        self.reason
    }
}

impl<T: fmt::Display> fmt::Display for TransitionRejection<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "cannot move from {} to {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for TransitionRejection<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Amber,
        Broken,
    }

    impl fmt::Display for Light {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(formatter, "{self:?}")
        }
    }

    struct TrafficLight(Light);

    impl StateMachine for TrafficLight {
        type Tag = Light;
        const TRANSITIONS: &'static [(Light, Light)] = &[
            (Light::Red, Light::Green),
            (Light::Green, Light::Amber),
            (Light::Amber, Light::Red),
            (Light::Amber, Light::Broken),
        ];
        const TERMINAL: &'static [Light] = &[Light::Broken];

        fn tag(&self) -> Light {
            self.0
        }
    }

    #[rstest]
    #[case(Light::Red, Light::Green, Ok(()))]
    #[case(Light::Red, Light::Amber, Err(RejectionReason::InvalidTransition))]
    #[case(Light::Green, Light::Green, Err(RejectionReason::InvalidTransition))]
    #[case(Light::Broken, Light::Red, Err(RejectionReason::TerminalState))]
    #[case(Light::Broken, Light::Broken, Err(RejectionReason::TerminalState))]
    fn validates_against_table(
        #[case] from: Light,
        #[case] to: Light,
        #[case] expected: Result<(), RejectionReason>,
    ) {
        let outcome = validate_transition::<TrafficLight>(from, to).map_err(|r| r.reason());
        assert_eq!(outcome, expected);
    }

    #[rstest]
    fn allowed_targets_follow_table_order() {
        let targets: Vec<Light> = allowed_targets::<TrafficLight>(Light::Amber).collect();
        assert_eq!(targets, vec![Light::Red, Light::Broken]);
        assert_eq!(allowed_targets::<TrafficLight>(Light::Broken).count(), 0);
    }

    #[rstest]
    fn entity_helpers_use_current_tag() {
        let light = TrafficLight(Light::Broken);
        assert!(light.is_terminal());
        assert!(light.can_transition_to(Light::Red).is_err());
    }

    #[rstest]
    fn rejection_display_names_both_states() {
        let rejection = TransitionRejection::new(Light::Red, Light::Amber, RejectionReason::InvalidTransition);
        assert_eq!(
            rejection.to_string(),
            "cannot move from Red to Amber: invalid_transition"
        );
    }
}
