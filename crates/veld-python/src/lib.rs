//! Embedded-Python bridge for pipeline stages
//!
//! This crate lets a pipeline stage hand one buffer's worth of point
//! attributes to a user-supplied Python function and copy the results back:
//!
//! 1. [`Script`] holds the source text, a module name and an entry function.
//! 2. [`Invocation`] compiles the script once, then per unit of work stages
//!    attribute columns in (`begin`), runs the entry function (`execute`)
//!    and stages results out (`end`).
//! 3. [`ScriptStage`] wraps that cycle for drivers that process one view at
//!    a time.
//!
//! Scripts receive their inputs and outputs as `array.array` objects keyed
//! by dimension name, plus the `metadata`, `schema`, `spatialreference` and
//! `pdalargs` module globals.
//!
//! The embedded interpreter is a single process-wide resource; every call
//! into it serializes on the interpreter lock. See [`Environment`].

pub mod environment;
pub mod errors;
pub mod invocation;
pub mod script;
pub mod stage;

pub use environment::{ArrayDescriptor, Environment};
pub use errors::BridgeError;
pub use invocation::Invocation;
pub use script::Script;
pub use stage::ScriptStage;
