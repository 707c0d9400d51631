// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runners for the suite-under-test.
//!
//! The main abstraction here is [`ProbeRunner`]. Two implementations are provided:
//!
//! * [`ShellRunner`] runs the suite as a separate process, once per probe.
//! * [`InProcessRunner`] wraps a closure, for embedding the minimizer into an existing harness.

mod imp;
mod in_process;
mod shell;

pub use imp::*;
pub use in_process::*;
pub use shell::*;
