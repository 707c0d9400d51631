// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `test-bisect` failures.
///
/// `test-bisect` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum BisectExitCode {}

impl BisectExitCode {
    /// Bisection completed normally.
    ///
    /// This includes the case where the failures turned out not to depend on any other examples.
    pub const OK: i32 = 0;

    /// The initial run of the suite did not produce any failures, so there was nothing to bisect.
    pub const NO_FAILURES_FOUND: i32 = 4;

    /// Bisection was interrupted before it completed.
    ///
    /// The best reproduction found so far is printed out before exiting.
    pub const BISECT_INTERRUPTED: i32 = 100;

    /// The suite could not be run, or it did not report results in a usable form.
    pub const PROBE_RUNNER_FAILED: i32 = 102;

    /// The suite ran examples in an order inconsistent with the initial run.
    pub const INCONSISTENT_ORDERING: i32 = 103;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// A user issue happened while setting up a bisect invocation.
    pub const SETUP_ERROR: i32 = 96;
}
