//! Interpreters: the only layer that performs real operations.
//!
//! [`Interpret<E>`] is the protocol between the engine and infrastructure.
//! A specialized interpreter owns one effect category, makes exactly one
//! collaborator call per effect, and translates collaborator failures into
//! the category's [`InterpreterError`] variant. The
//! [`CompositeInterpreter`] routes any [`Effect`](crate::effect::Effect)
//! to the interpreter owning its category.

mod composite;
mod specialized;

use std::marker::PhantomData;
use std::sync::Arc;

pub use composite::{CompositeInterpreter, CompositeInterpreterBuilder};
pub use specialized::{
    CacheInterpreter, HealthcareInterpreter, IdentityInterpreter, MessagingInterpreter,
    PersistenceInterpreter, StorageInterpreter,
};

use crate::effect::{EffectReturn, EffectTag, EffectValue};
use crate::error::InterpreterError;
use crate::io::AsyncIO;
use crate::ports::AdapterIO;

/// Deferred outcome of interpreting one effect.
pub type Interpretation = AsyncIO<Result<EffectReturn, InterpreterError>>;

/// Executes effects of type `E`.
///
/// Returning an [`AsyncIO`] keeps the call itself free of side effects:
/// the operation runs when the driver awaits it.
pub trait Interpret<E>: Send + Sync {
    /// Describes how `effect` is carried out.
    fn interpret(&self, effect: E) -> Interpretation;
}

impl<E, T> Interpret<E> for Arc<T>
where
    T: Interpret<E> + ?Sized,
{
    fn interpret(&self, effect: E) -> Interpretation {
        (**self).interpret(effect)
    }
}

impl<E, T> Interpret<E> for &T
where
    T: Interpret<E> + ?Sized,
{
    fn interpret(&self, effect: E) -> Interpretation {
        (**self).interpret(effect)
    }
}

/// Adapts a closure into an interpreter. Handy for test doubles.
///
/// ```rust
/// use effectum::effect::{CacheEffect, EffectReturn, EffectValue, Operation};
/// use effectum::interpreter::{FnInterpreter, Interpret};
/// use effectum::io::AsyncIO;
///
/// let always_miss = FnInterpreter::new(|effect: CacheEffect| {
///     AsyncIO::pure(Ok(EffectReturn::new(effect.tag(), EffectValue::Cached(None))))
/// });
/// # let _ = always_miss.interpret(CacheEffect::Get { key: "k".into() });
/// ```
pub struct FnInterpreter<E, F> {
    function: F,
    _effect: PhantomData<fn(E)>,
}

impl<E, F> FnInterpreter<E, F>
where
    F: Fn(E) -> Interpretation + Send + Sync,
{
    /// Wraps `function`.
    pub const fn new(function: F) -> Self {
        Self {
            function,
            _effect: PhantomData,
        }
    }
}

impl<E, F> Interpret<E> for FnInterpreter<E, F>
where
    F: Fn(E) -> Interpretation + Send + Sync,
{
    fn interpret(&self, effect: E) -> Interpretation {
        (self.function)(effect)
    }
}

/// Turns one collaborator call into an interpretation tagged with `tag`.
fn complete<T, W>(tag: EffectTag, call: AdapterIO<T>, wrap: W) -> Interpretation
where
    T: Send + 'static,
    W: FnOnce(T) -> EffectValue + Send + 'static,
{
    call.fmap(move |result| {
        result
            .map(|value| EffectReturn::new(tag, wrap(value)))
            .map_err(|error| InterpreterError::from_adapter(tag.category(), error))
    })
}
