// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for `test-bisect`: finding the minimal set of examples that must run before
//! a set of failing examples for those failures to reproduce.
//!
//! The basic flow is:
//!
//! 1. A [`ProbeRunner`](runner::ProbeRunner) runs the full suite once to find the failures.
//! 2. The failing examples are run on their own. If they still fail, the failure is
//!    order-independent and there is nothing more to do.
//! 3. Otherwise, the [`ExampleMinimizer`](minimize::ExampleMinimizer) repeatedly halves the set of
//!    non-failing examples until no further reduction is possible.
//!
//! Progress is published to a [`ProgressSink`](reporter::ProgressSink) throughout, and the best
//! reproduction found so far is available at every point, including after cancellation.

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod example;
mod helpers;
pub mod minimize;
pub mod repro;
pub mod reporter;
pub mod runner;
pub mod signal;
mod time;

pub use helpers::plural;
