// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::BisectError, example::ExampleId};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexSet;
use std::{fmt, time::Duration};

/// A bisect event.
///
/// Events are produced by an [`ExampleMinimizer`](crate::minimize::ExampleMinimizer) and a
/// [`BisectCoordinator`](crate::coordinator::BisectCoordinator), and consumed by any
/// [`BisectListener`](super::BisectListener) registered with a [`ProgressSink`](super::ProgressSink).
#[derive(Clone, Debug)]
pub struct BisectEvent<'a> {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The amount of time elapsed since the start of bisection.
    pub elapsed: Duration,

    /// The kind of bisect event this is.
    pub kind: BisectEventKind<'a>,
}

/// The kind of bisect event this is.
///
/// Forms part of [`BisectEvent`].
#[derive(Clone, Debug)]
pub enum BisectEventKind<'a> {
    /// Bisection started.
    MinimizationStarted {
        /// A description of the options bisection was started with.
        options_description: &'a str,

        /// The name of the probe runner.
        runner: &'static str,
    },

    /// The initial run of the full suite completed.
    InitialRunComplete {
        /// The examples that failed, in suite order.
        failed_ids: &'a IndexSet<ExampleId>,

        /// The number of examples that failed.
        failing_count: usize,

        /// The number of examples that didn't fail.
        non_failing_count: usize,

        /// How long the initial run took.
        duration: Duration,
    },

    /// The check for whether the failures depend on other examples started.
    OrderDependencyCheckStarted,

    /// The check for whether the failures depend on other examples completed.
    OrderDependencyCheckComplete {
        /// True if the failures did not reproduce when run on their own.
        order_dependent: bool,

        /// If the failures are order-independent, a caveat supplied by the probe runner.
        runner_caveat: Option<&'static str>,
    },

    /// A bisection round started.
    RoundStarted {
        /// The candidates examined by this round.
        candidate_range: CandidateRange,

        /// The total number of non-failing examples, for display purposes.
        candidates_count: usize,
    },

    /// A bisection round finished.
    RoundFinished {
        /// The candidates examined by this round.
        candidate_range: CandidateRange,

        /// What the round found out.
        outcome: RoundOutcome,

        /// The number of non-failing examples that may still be needed after this round.
        remaining_count: usize,

        /// The number of non-failing examples proven to be needed after this round.
        needed_count: usize,

        /// How long the round took.
        duration: Duration,
    },

    /// A single probe started.
    IndividualRunStarted {
        /// The examples being run, in order.
        ids: &'a [ExampleId],
    },

    /// A single probe completed.
    IndividualRunComplete {
        /// The examples that were run, in order.
        ids: &'a [ExampleId],

        /// The examples that failed.
        failed_ids: &'a IndexSet<ExampleId>,

        /// How long the probe took.
        duration: Duration,
    },

    /// Bisection completed.
    MinimizationComplete {
        /// The number of non-failing examples in the original suite.
        original_non_failing_count: usize,

        /// The number of non-failing examples needed to reproduce the failures.
        final_non_failing_count: usize,

        /// How long bisection took in total.
        duration: Duration,
    },

    /// Bisection was cancelled before it completed.
    MinimizationAborted {
        /// The smallest reproduction found so far, in suite order.
        ///
        /// `None` if cancellation happened before the initial run completed.
        current_best_ids: Option<&'a [ExampleId]>,

        /// The reason bisection was cancelled.
        reason: CancelReason,
    },

    /// Bisection failed.
    MinimizationFailed {
        /// The error that caused bisection to fail.
        reason: &'a BisectError,
    },
}

impl BisectEventKind<'_> {
    /// Returns the name of this event, as used in machine-readable output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MinimizationStarted { .. } => "minimization_started",
            Self::InitialRunComplete { .. } => "initial_run_complete",
            Self::OrderDependencyCheckStarted => "order_dependency_check_started",
            Self::OrderDependencyCheckComplete { .. } => "order_dependency_check_complete",
            Self::RoundStarted { .. } => "round_started",
            Self::RoundFinished { .. } => "round_finished",
            Self::IndividualRunStarted { .. } => "individual_run_started",
            Self::IndividualRunComplete { .. } => "individual_run_complete",
            Self::MinimizationComplete { .. } => "minimization_complete",
            Self::MinimizationAborted { .. } => "minimization_aborted",
            Self::MinimizationFailed { .. } => "minimization_failed",
        }
    }
}

/// A set of candidates, identified by its position in the list of non-failing examples.
///
/// Candidate sets always cover a contiguous range of that list: the initial set is the whole
/// list, and every later set is one half of an earlier one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct CandidateRange {
    /// The index of the first candidate.
    pub start: usize,

    /// One past the index of the last candidate.
    pub end: usize,
}

impl CandidateRange {
    /// Creates a new range.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "start {start} is at most end {end}");
        Self { start, end }
    }

    /// Returns the number of candidates in this range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this range is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `index` is within this range.
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Splits this range into two halves, with the first half taking the extra candidate if the
    /// length is odd.
    pub fn split(&self) -> (Self, Self) {
        let mid = self.start + self.len().div_ceil(2);
        (Self::new(self.start, mid), Self::new(mid, self.end))
    }
}

/// Displays the range as 1-based and inclusive, e.g. `1-4` for the first four candidates.
impl fmt::Display for CandidateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len() <= 1 {
            write!(f, "{}", self.start + 1)
        } else {
            write!(f, "{}-{}", self.start + 1, self.end)
        }
    }
}

/// The outcome of a bisection round.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RoundOutcome {
    /// The first half of the candidates was not needed and was discarded.
    ///
    /// This is also the outcome when the failures reproduce with either half removed. Treating
    /// that as [`MultipleCulprits`](Self::MultipleCulprits) would keep both halves; discarding
    /// the first is sound, since the failures reproduced without it, and gives a smaller result.
    EliminatedFirst,

    /// The second half of the candidates was not needed and was discarded.
    EliminatedSecond,

    /// Neither half reproduced the failures on its own, so both halves contain needed examples.
    MultipleCulprits,
}

impl RoundOutcome {
    /// Returns the name of this outcome, as used in machine-readable output.
    pub fn to_static_str(self) -> &'static str {
        match self {
            Self::EliminatedFirst => "eliminated_first",
            Self::EliminatedSecond => "eliminated_second",
            Self::MultipleCulprits => "multiple_culprits",
        }
    }
}

/// The reason why bisection is being cancelled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum CancelReason {
    /// Cancellation was requested through a [`CancelToken`](crate::signal::CancelToken).
    Requested,

    /// A termination signal (on Unix, SIGTERM or SIGHUP) was received.
    Signal,

    /// An interrupt (on Unix, Ctrl-C) was received.
    Interrupt,
}

impl CancelReason {
    /// Returns a short description of this reason.
    pub fn to_static_str(self) -> &'static str {
        match self {
            CancelReason::Requested => "cancellation requested",
            CancelReason::Signal => "signal",
            CancelReason::Interrupt => "interrupt",
        }
    }
}
