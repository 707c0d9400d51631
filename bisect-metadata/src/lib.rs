// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the data exchanged between `test-bisect` and the suite it bisects.
//!
//! A suite-under-test driven by the shell runner reports its results by writing a
//! [`ProbeResultsSummary`] as JSON to the path named by [`RESULTS_FILE_ENV`]. The documented exit
//! codes for `test-bisect` are in [`BisectExitCode`].

mod errors;
mod exit_codes;
mod results;

pub use errors::*;
pub use exit_codes::*;
pub use results::*;
