//! The fail-fast driver for [`Program`]s.
//!
//! The runner alternates between two states. While *running* it hands the
//! pending effect to the interpreter, awaits the outcome, and resumes the
//! program with the value. The first failure moves it to *halted*: the
//! failure is returned and the program is dropped, so effects after the
//! failing one are never built, let alone executed.
//!
//! Effects of one program are interpreted strictly one at a time, in the
//! order the program yields them.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use effectum::effect::cache;
//! use effectum::interpreter::{CacheInterpreter, CompositeInterpreter};
//! use effectum::memory::InMemoryCache;
//! use effectum::runner::ProgramRunner;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let interpreter = CompositeInterpreter::builder()
//!     .with_cache(CacheInterpreter::new(Arc::new(InMemoryCache::new())))
//!     .build();
//! let runner = ProgramRunner::new(interpreter);
//!
//! let cached = runner.run(cache::get("greeting")).await;
//! assert_eq!(cached, Ok(None));
//! # });
//! ```

use crate::effect::{Effect, EffectTag};
use crate::error::{DefectReason, InterpreterError};
use crate::interpreter::Interpret;
use crate::program::{Program, Step};

/// Result of [`ProgramRunner::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct Execution<A> {
    /// The program's value, or the failure that halted it.
    pub outcome: Result<A, InterpreterError>,
    /// Every effect handed to the interpreter, in yield order. When the
    /// outcome is a failure, the last entry is the effect that failed.
    pub trace: Vec<EffectTag>,
}

impl<A> Execution<A> {
    /// Drops the trace.
    pub fn into_outcome(self) -> Result<A, InterpreterError> {
        self.outcome
    }

    /// Number of effects that were interpreted.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.trace.len()
    }
}

/// Drives programs against an interpreter.
///
/// A runner holds no per-program state; one runner may drive any number
/// of programs concurrently, each in its own `run` call.
#[derive(Debug, Clone)]
pub struct ProgramRunner<I> {
    interpreter: I,
}

impl<I> ProgramRunner<I>
where
    I: Interpret<Effect>,
{
    /// Creates a runner around `interpreter`.
    pub const fn new(interpreter: I) -> Self {
        Self { interpreter }
    }

    /// The interpreter effects are handed to.
    pub const fn interpreter(&self) -> &I {
        &self.interpreter
    }

    /// Runs `program` to completion or to its first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`InterpreterError`] produced while interpreting
    /// the program's effects, or a defect if the program is resumed with a
    /// value of the wrong shape.
    pub async fn run<A>(&self, program: Program<A>) -> Result<A, InterpreterError>
    where
        A: Send + 'static,
    {
        self.execute(program).await.into_outcome()
    }

    /// Like [`run`](Self::run), also reporting which effects were
    /// interpreted.
    pub async fn execute<A>(&self, program: Program<A>) -> Execution<A>
    where
        A: Send + 'static,
    {
        let mut trace = Vec::new();
        let mut step = program.start();

        let outcome = loop {
            let (effect, resume) = match step {
                Step::Done(value) => {
                    tracing::debug!(steps = trace.len(), "program completed");
                    break Ok(value);
                }
                Step::Suspended(effect, resume) => (effect, resume),
            };

            let tag = effect.tag();
            trace.push(tag);
            tracing::debug!(
                step = trace.len(),
                effect = %tag,
                category = %tag.category(),
                "interpreting effect"
            );

            let resumed = self
                .interpreter
                .interpret(effect)
                .run_async()
                .await
                .and_then(|returned| {
                    if returned.tag() == tag {
                        resume.resume(returned.into_value())
                    } else {
                        Err(InterpreterError::defect(
                            tag,
                            DefectReason::ReturnMismatch {
                                expected: tag.as_str(),
                                found: returned.tag().as_str(),
                            },
                        ))
                    }
                });

            match resumed {
                Ok(next) => step = next,
                Err(error) => {
                    tracing::warn!(
                        step = trace.len(),
                        effect = %tag,
                        error = %error,
                        retryable = error.is_retryable(),
                        "program halted"
                    );
                    break Err(error);
                }
            }
        };

        Execution { outcome, trace }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectReturn, EffectValue, Operation, cache};
    use crate::interpreter::{FnInterpreter, Interpretation};
    use crate::io::AsyncIO;
    use rstest::rstest;

    fn answering(
        value: EffectValue,
    ) -> FnInterpreter<Effect, impl Fn(Effect) -> Interpretation + Send + Sync> {
        FnInterpreter::new(move |effect: Effect| {
            AsyncIO::pure(Ok(EffectReturn::new(effect.tag(), value.clone())))
        })
    }

    #[rstest]
    #[tokio::test]
    async fn pure_program_needs_no_interpreter_call() {
        let runner = ProgramRunner::new(answering(EffectValue::Unit));
        let execution = runner.execute(Program::pure(5)).await;
        assert_eq!(execution.outcome, Ok(5));
        assert!(execution.trace.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn trace_follows_yield_order() {
        let runner = ProgramRunner::new(answering(EffectValue::Unit));
        let program = cache::invalidate("a")
            .then(cache::put("b", serde_json::json!(1), std::time::Duration::from_secs(1)));

        let execution = runner.execute(program).await;

        assert_eq!(execution.outcome, Ok(()));
        assert_eq!(
            execution.trace,
            vec![EffectTag::CacheInvalidate, EffectTag::CachePut]
        );
        assert_eq!(execution.steps(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_payload_is_defect() {
        let runner = ProgramRunner::new(answering(EffectValue::PasswordVerification(true)));

        let error = runner.run(cache::get("k")).await.unwrap_err();

        assert!(matches!(
            error,
            InterpreterError::Defect {
                effect: EffectTag::CacheGet,
                reason: DefectReason::ReturnMismatch { .. },
            }
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn mistagged_return_is_defect() {
        let runner = ProgramRunner::new(FnInterpreter::new(|_: Effect| {
            AsyncIO::pure(Ok(EffectReturn::new(EffectTag::CachePut, EffectValue::Unit)))
        }));

        let error = runner.run(cache::invalidate("k")).await.unwrap_err();

        assert_eq!(
            error,
            InterpreterError::defect(
                EffectTag::CacheInvalidate,
                DefectReason::ReturnMismatch {
                    expected: "cache_invalidate",
                    found: "cache_put",
                },
            )
        );
    }
}
