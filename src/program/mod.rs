//! Suspendable computations.
//!
//! A [`Program<A>`] is business logic written as a chain of effect
//! descriptions. It never performs I/O: advancing it either finishes with
//! an `A` or stops at a suspension point, handing out one [`Effect`]
//! together with a [`Resume`] that continues the computation once the
//! effect's value is known.
//!
//! ```text
//! Program<A> = Done(A)
//!            | Suspended { effect: Effect, continuation: ContinuationQueue }
//! ```
//!
//! The continuation is built with the "reflection without remorse"
//! technique: `map` and `flat_map` append to a queue in O(1), and resuming
//! drains the queue in a loop, so arbitrarily long chains are stack safe.
//!
//! Effects after a suspension point do not exist until the program is
//! resumed past it. A driver that stops resuming (because an interpreter
//! failed) therefore guarantees the remaining effects are never built.
//!
//! # Examples
//!
//! ```rust
//! use effectum::effect::{EffectValue, Lookup, persistence::{self, RecordId}};
//! use effectum::program::{Program, Step};
//!
//! let program: Program<bool> = persistence::get_record(RecordId::new("r-1"))
//!     .map(|lookup| lookup.is_found());
//!
//! let Step::Suspended(effect, resume) = program.start() else {
//!     unreachable!("get_record always suspends");
//! };
//! assert_eq!(effect.resource_id().as_deref(), Some("r-1"));
//!
//! let step = resume
//!     .resume(EffectValue::Record(Lookup::NotFound { id: "r-1".into() }))
//!     .unwrap();
//! assert!(matches!(step, Step::Done(false)));
//! ```

mod continuation;

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use continuation::{ContinuationQueue, ContinuationStack, Erased};

use crate::effect::{Effect, EffectTag, EffectValue};
use crate::error::{DefectReason, InterpreterError};

// =============================================================================
// Program
// =============================================================================

/// A suspendable computation producing an `A`.
///
/// Programs are single-use values: advancing one consumes it. Create a
/// fresh program per unit of work.
#[must_use = "a program does nothing until a runner drives it"]
pub struct Program<A> {
    inner: ProgramInner<A>,
}

enum ProgramInner<A> {
    Done(A),
    Suspended {
        effect: Effect,
        continuation: ContinuationQueue,
        _result: PhantomData<fn() -> A>,
    },
}

impl<A> Program<A> {
    /// A program that finishes immediately with `value`.
    pub const fn pure(value: A) -> Self {
        Self {
            inner: ProgramInner::Done(value),
        }
    }

    /// Returns `true` if the program has no suspension point left.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.inner, ProgramInner::Done(_))
    }

    /// The effect this program is suspended on, if any.
    #[must_use]
    pub const fn pending_effect(&self) -> Option<&Effect> {
        match &self.inner {
            ProgramInner::Done(_) => None,
            ProgramInner::Suspended { effect, .. } => Some(effect),
        }
    }
}

impl<A> Program<A>
where
    A: TryFrom<EffectValue, Error = EffectValue> + Send + 'static,
{
    /// A program that suspends on `effect` and finishes with the value the
    /// interpreter resumes it with.
    ///
    /// The result type fixes which [`EffectValue`] variant is accepted;
    /// resuming with any other variant is a defect.
    pub fn perform(effect: impl Into<Effect>) -> Self {
        Self {
            inner: ProgramInner::Suspended {
                effect: effect.into(),
                continuation: ContinuationQueue::extract::<A>(),
                _result: PhantomData,
            },
        }
    }
}

impl<A: Send + 'static> Program<A> {
    /// Transforms the final value.
    pub fn map<B, F>(self, function: F) -> Program<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        match self.inner {
            ProgramInner::Done(value) => Program::pure(function(value)),
            ProgramInner::Suspended {
                effect,
                continuation,
                ..
            } => Program::suspended(effect, continuation.push_map(function)),
        }
    }

    /// Continues with the program `function` builds from the final value.
    ///
    /// `function` runs only after every effect before it has succeeded.
    pub fn flat_map<B, F>(self, function: F) -> Program<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Program<B> + Send + 'static,
    {
        match self.inner {
            ProgramInner::Done(value) => function(value),
            ProgramInner::Suspended {
                effect,
                continuation,
                ..
            } => Program::suspended(effect, continuation.push_flat_map(function)),
        }
    }

    /// Alias for [`Program::flat_map`].
    pub fn and_then<B, F>(self, function: F) -> Program<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Program<B> + Send + 'static,
    {
        self.flat_map(function)
    }

    /// Runs `next` after `self`, discarding `self`'s value.
    pub fn then<B: Send + 'static>(self, next: Program<B>) -> Program<B> {
        self.flat_map(move |_| next)
    }

    /// Runs `programs` one after another, collecting their values in order.
    ///
    /// If an effect of one program fails, later programs never start.
    pub fn sequence<I>(programs: I) -> Program<Vec<A>>
    where
        I: IntoIterator<Item = Self>,
    {
        programs
            .into_iter()
            .fold(Program::pure(Vec::new()), |accumulated, program| {
                accumulated.flat_map(move |mut values| {
                    program.map(move |value| {
                        values.push(value);
                        values
                    })
                })
            })
    }

    /// Advances to the first suspension point.
    pub fn start(self) -> Step<A> {
        match self.inner {
            ProgramInner::Done(value) => Step::Done(value),
            ProgramInner::Suspended {
                effect,
                continuation,
                ..
            } => {
                let tag = effect.tag();
                Step::Suspended(
                    effect,
                    Resume {
                        tag,
                        stack: ContinuationStack::new(continuation),
                        _result: PhantomData,
                    },
                )
            }
        }
    }

    fn erase(self) -> Program<Erased> {
        match self.inner {
            ProgramInner::Done(value) => Program::pure(Box::new(value) as Erased),
            ProgramInner::Suspended {
                effect,
                continuation,
                ..
            } => Program::suspended(effect, continuation),
        }
    }
}

impl<A> Program<A> {
    const fn suspended(effect: Effect, continuation: ContinuationQueue) -> Self {
        Self {
            inner: ProgramInner::Suspended {
                effect,
                continuation,
                _result: PhantomData,
            },
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for Program<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ProgramInner::Done(value) => formatter.debug_tuple("Done").field(value).finish(),
            ProgramInner::Suspended {
                effect,
                continuation,
                ..
            } => formatter
                .debug_struct("Suspended")
                .field("effect", &effect.tag())
                .field("continuations", &continuation.len())
                .finish(),
        }
    }
}

// =============================================================================
// Step / Resume
// =============================================================================

/// Where a program stands after being advanced.
pub enum Step<A> {
    /// The program yielded an effect and waits for its value.
    Suspended(Effect, Resume<A>),
    /// The program finished.
    Done(A),
}

impl<A> fmt::Debug for Step<A>
where
    A: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspended(effect, _) => formatter
                .debug_tuple("Suspended")
                .field(&effect.tag())
                .finish(),
            Self::Done(value) => formatter.debug_tuple("Done").field(value).finish(),
        }
    }
}

/// The rest of a program suspended on one effect.
///
/// Consumed by [`Resume::resume`]; a suspended program can be resumed
/// exactly once. Dropping it abandons the program.
#[must_use = "dropping a Resume abandons the program"]
pub struct Resume<A> {
    tag: EffectTag,
    stack: ContinuationStack,
    _result: PhantomData<fn() -> A>,
}

impl<A: Send + 'static> Resume<A> {
    /// Tag of the effect this continuation waits on.
    #[must_use]
    pub const fn awaiting(&self) -> EffectTag {
        self.tag
    }

    /// Feeds the effect's value back and advances to the next suspension
    /// point or to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`InterpreterError::Defect`] with
    /// [`DefectReason::ReturnMismatch`] when `value` is not the variant the
    /// awaited effect resumes with.
    pub fn resume(self, value: EffectValue) -> Result<Step<A>, InterpreterError> {
        let Self { tag, mut stack, .. } = self;
        let mut current: Erased = Box::new(value);

        loop {
            let Some(arrow) = stack.pop() else {
                return current
                    .downcast::<A>()
                    .map(|value| Step::Done(*value))
                    .map_err(|_| {
                        InterpreterError::defect(
                            tag,
                            DefectReason::ReturnMismatch {
                                expected: type_name::<A>(),
                                found: "a value of another type",
                            },
                        )
                    });
            };

            let next = arrow
                .apply(current)
                .map_err(|reason| InterpreterError::defect(tag, reason))?;

            match next.inner {
                ProgramInner::Done(value) => current = value,
                ProgramInner::Suspended {
                    effect,
                    continuation,
                    ..
                } => {
                    stack.push_queue(continuation);
                    let tag = effect.tag();
                    return Ok(Step::Suspended(
                        effect,
                        Self {
                            tag,
                            stack,
                            _result: PhantomData,
                        },
                    ));
                }
            }
        }
    }
}

impl<A> fmt::Debug for Resume<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Resume")
            .field("awaiting", &self.tag)
            .field("depth", &self.stack.depth())
            .finish()
    }
}

static_assertions::assert_impl_all!(Program<i32>: Send);
static_assertions::assert_impl_all!(Resume<String>: Send);
