//! Type-erased continuations of a suspended program.
//!
//! `flat_map` appends to a queue instead of nesting closures, so building a
//! chain is O(1) per step and resuming it is O(n) overall, however deep the
//! chain grows.
//!
//! # Invariants
//!
//! - Arrows of one queue run in the order they were pushed.
//! - A queue produced while resuming runs to completion before the queue
//!   that was interrupted by it continues.

use std::any::{Any, type_name};
use std::marker::PhantomData;

use smallvec::SmallVec;

use super::Program;
use crate::effect::EffectValue;
use crate::error::DefectReason;

/// A value whose concrete type is known only to the arrow consuming it.
pub(crate) type Erased = Box<dyn Any + Send>;

const CONTINUATION_INLINE_CAPACITY: usize = 8;

/// Converts `A -> Program<B>` to `Erased -> Program<Erased>`.
///
/// `apply` consumes the arrow, so each continuation runs at most once.
pub(crate) trait Arrow: Send {
    fn apply(self: Box<Self>, input: Erased) -> Result<Program<Erased>, DefectReason>;
}

fn downcast<A: 'static>(input: Erased) -> Result<A, DefectReason> {
    input
        .downcast::<A>()
        .map(|boxed| *boxed)
        .map_err(|_| DefectReason::ReturnMismatch {
            expected: type_name::<A>(),
            found: "a value of another type",
        })
}

/// Turns the interpreter's [`EffectValue`] into the type the effect's
/// constructor promised.
struct ExtractArrow<R>(PhantomData<fn() -> R>);

impl<R> Arrow for ExtractArrow<R>
where
    R: TryFrom<EffectValue, Error = EffectValue> + Send + 'static,
{
    fn apply(self: Box<Self>, input: Erased) -> Result<Program<Erased>, DefectReason> {
        let value = downcast::<EffectValue>(input)?;
        R::try_from(value)
            .map(|extracted| Program::pure(Box::new(extracted) as Erased))
            .map_err(|found| DefectReason::ReturnMismatch {
                expected: type_name::<R>(),
                found: found.kind(),
            })
    }
}

struct MapArrow<A, B, F> {
    function: F,
    _phantom: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Arrow for MapArrow<A, B, F>
where
    A: Send + 'static,
    B: Send + 'static,
    F: FnOnce(A) -> B + Send + 'static,
{
    fn apply(self: Box<Self>, input: Erased) -> Result<Program<Erased>, DefectReason> {
        let value = downcast::<A>(input)?;
        Ok(Program::pure(Box::new((self.function)(value)) as Erased))
    }
}

struct FlatMapArrow<A, B, F> {
    function: F,
    _phantom: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Arrow for FlatMapArrow<A, B, F>
where
    A: Send + 'static,
    B: Send + 'static,
    F: FnOnce(A) -> Program<B> + Send + 'static,
{
    fn apply(self: Box<Self>, input: Erased) -> Result<Program<Erased>, DefectReason> {
        let value = downcast::<A>(input)?;
        Ok((self.function)(value).erase())
    }
}

// =============================================================================
// ContinuationQueue
// =============================================================================

/// The continuations waiting on one suspended effect.
///
/// Short chains (eight arrows or fewer) are stored inline.
pub(crate) struct ContinuationQueue {
    arrows: SmallVec<[Box<dyn Arrow>; CONTINUATION_INLINE_CAPACITY]>,
}

impl ContinuationQueue {
    pub(crate) fn extract<R>() -> Self
    where
        R: TryFrom<EffectValue, Error = EffectValue> + Send + 'static,
    {
        let mut arrows: SmallVec<[Box<dyn Arrow>; CONTINUATION_INLINE_CAPACITY]> =
            SmallVec::new();
        arrows.push(Box::new(ExtractArrow::<R>(PhantomData)));
        Self { arrows }
    }

    pub(crate) fn push_map<A, B, F>(mut self, function: F) -> Self
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.arrows.push(Box::new(MapArrow {
            function,
            _phantom: PhantomData,
        }));
        self
    }

    pub(crate) fn push_flat_map<A, B, F>(mut self, function: F) -> Self
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> Program<B> + Send + 'static,
    {
        self.arrows.push(Box::new(FlatMapArrow {
            function,
            _phantom: PhantomData,
        }));
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.arrows.len()
    }
}

// =============================================================================
// ContinuationStack
// =============================================================================

type Arrows = smallvec::IntoIter<[Box<dyn Arrow>; CONTINUATION_INLINE_CAPACITY]>;

/// Queues being drained while a program is resumed.
///
/// When an arrow yields a new effect, its queue is pushed on top and the
/// interrupted queue waits in `pending` until the new one is exhausted.
pub(crate) struct ContinuationStack {
    current: Arrows,
    pending: Vec<Arrows>,
}

impl ContinuationStack {
    pub(crate) fn new(initial: ContinuationQueue) -> Self {
        Self {
            current: initial.arrows.into_iter(),
            pending: Vec::new(),
        }
    }

    pub(crate) fn push_queue(&mut self, queue: ContinuationQueue) {
        let interrupted = std::mem::replace(&mut self.current, queue.arrows.into_iter());
        if interrupted.len() > 0 {
            self.pending.push(interrupted);
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Box<dyn Arrow>> {
        loop {
            if let Some(arrow) = self.current.next() {
                return Some(arrow);
            }
            self.current = self.pending.pop()?;
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.pending.len() + 1
    }
}
