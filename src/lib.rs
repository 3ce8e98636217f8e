//! # effectum
//!
//! An algebraic effect execution engine.
//!
//! Business logic is written as [`Program`](program::Program)s: suspendable
//! computations that describe the side effects they need as immutable
//! [`Effect`](effect::Effect) values instead of performing them. A
//! [`ProgramRunner`](runner::ProgramRunner) drives a program, handing each
//! effect to an interpreter and resuming the program with the typed result,
//! and halts on the first failure.
//!
//! ## Overview
//!
//! - **Effect algebra** ([`effect`], [`result`], [`error`]): closed effect
//!   enums grouped by category, the values they resume with, and the two
//!   error families (collaborator failures and interpreter failures).
//! - **Programs** ([`program`]): `map` / `flat_map` composition with a
//!   stack-safe continuation queue.
//! - **Interpreters** ([`interpreter`], [`ports`]): one specialized
//!   interpreter per category over injected collaborators, and a composite
//!   router that audits sensitive effects ([`audit`]) and counts outcomes
//!   ([`metrics`]).
//! - **Runner** ([`runner`]): the fail-fast driver.
//! - **State machines** ([`state_machine`]): table-validated transitions,
//!   with the appointment lifecycle in [`healthcare`] as the worked domain.
//!
//! ## Feature Flags
//!
//! - `memory` (default): in-memory collaborators for every port.
//!
//! ## Example
//!
//! ```rust
//! use effectum::memory::InMemoryBackends;
//! use effectum::prelude::*;
//! use effectum::effect::persistence::{self, RecordId};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let backends = InMemoryBackends::new();
//! let runner = ProgramRunner::new(backends.composite().build());
//!
//! let program = persistence::get_record(RecordId::new("missing"))
//!     .map(|lookup| if lookup.is_found() { "found" } else { "not_found" });
//!
//! assert_eq!(runner.run(program).await, Ok("not_found"));
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports the types needed to write and run programs.
///
/// # Usage
///
/// ```rust
/// use effectum::prelude::*;
/// ```
pub mod prelude {
    pub use crate::effect::{Effect, EffectCategory, EffectTag, EffectValue, Lookup, Operation};
    pub use crate::error::{AdapterError, InterpreterError};
    pub use crate::interpreter::{CompositeInterpreter, Interpret};
    pub use crate::io::AsyncIO;
    pub use crate::program::{Program, Step};
    pub use crate::result::ResultExt;
    pub use crate::runner::{Execution, ProgramRunner};
    pub use crate::state_machine::StateMachine;
}

pub mod audit;
pub mod config;
pub mod effect;
pub mod error;
pub mod healthcare;
pub mod interpreter;
pub mod io;
#[cfg(feature = "memory")]
pub mod memory;
pub mod metrics;
pub mod ports;
pub mod program;
pub mod result;
pub mod runner;
pub mod state_machine;
pub mod telemetry;
