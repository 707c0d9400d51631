// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::StderrStyles;
use bisect_metadata::BisectExitCode;
use bisect_runner::{
    errors::*,
    example::ExampleId,
    reporter::CancelReason,
};
use itertools::Itertools;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders: errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An expected failure of `test-bisect`, with a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid { error: std::io::Error },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("no command specified")]
    NoCommand { profile: String },
    #[error("failed to create async runtime")]
    RuntimeCreate {
        #[source]
        error: std::io::Error,
    },
    #[error("failed to set up signal handler")]
    SignalHandlerSetupError {
        #[from]
        err: SignalHandlerSetupError,
    },
    #[error("no failures found")]
    NoFailuresFound,
    #[error("inconsistent ordering")]
    InconsistentOrdering {
        expected: Vec<ExampleId>,
        actual: Vec<ExampleId>,
    },
    #[error("probe runner failed")]
    ProbeRunnerFailed {
        #[from]
        err: ProbeRunnerError,
    },
    #[error("bisect failed")]
    BisectFailed {
        #[source]
        err: BisectError,
    },
    #[error("bisect interrupted")]
    BisectInterrupted { reason: CancelReason },
    #[error("writing event failed")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("writing summary failed")]
    WriteSummaryError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn no_command(profile: impl Into<String>) -> Self {
        Self::NoCommand {
            profile: profile.into(),
        }
    }

    pub(crate) fn bisect_interrupted(reason: CancelReason) -> Self {
        Self::BisectInterrupted { reason }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoCommand { .. }
            | Self::RuntimeCreate { .. }
            | Self::SignalHandlerSetupError { .. } => BisectExitCode::SETUP_ERROR,
            Self::NoFailuresFound => BisectExitCode::NO_FAILURES_FOUND,
            Self::InconsistentOrdering { .. } => BisectExitCode::INCONSISTENT_ORDERING,
            Self::ProbeRunnerFailed { .. } => BisectExitCode::PROBE_RUNNER_FAILED,
            Self::BisectFailed { .. } => 1,
            Self::BisectInterrupted { .. } => BisectExitCode::BISECT_INTERRUPTED,
            Self::WriteEventError { .. } | Self::WriteSummaryError { .. } => {
                BisectExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirInvalid { error } => {
                tracing::error!("could not determine the current directory");
                Some(error as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                tracing::error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                tracing::error!(
                    "failed to parse bisect config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::ProfileNotFound { err } => {
                tracing::error!("{}", err);
                err.source()
            }
            Self::NoCommand { profile } => {
                tracing::error!(
                    "no command specified to run the suite\n\
                     (hint: pass one after `--`, or set `command` in profile `{}`)",
                    profile.style(styles.bold)
                );
                None
            }
            Self::RuntimeCreate { error } => {
                tracing::error!("failed to create async runtime");
                Some(error as &dyn Error)
            }
            Self::SignalHandlerSetupError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::NoFailuresFound => {
                tracing::error!(
                    "no failures found: bisect only works in the presence of one or more \
                     failing examples"
                );
                None
            }
            Self::InconsistentOrdering { expected, actual } => {
                tracing::error!(
                    "the example ordering is inconsistent, so bisect cannot work\n\
                     (hint: if the suite runs in random order, pass a fixed seed)\n\
                     expected: {}\n  actual: {}",
                    expected.iter().join(", "),
                    actual.iter().join(", "),
                );
                None
            }
            Self::ProbeRunnerFailed { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::BisectFailed { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::BisectInterrupted { reason } => {
                tracing::error!("bisect {}", describe_cancel_reason(*reason));
                None
            }
            Self::WriteEventError { err } => {
                tracing::error!("failed to write progress output");
                Some(err as &dyn Error)
            }
            Self::WriteSummaryError { err } => {
                tracing::error!("failed to write summary");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: "test_bisect::no_heading", "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

impl From<BisectError> for ExpectedError {
    fn from(err: BisectError) -> Self {
        match err {
            BisectError::NoFailures => Self::NoFailuresFound,
            BisectError::InconsistentOrdering { expected, actual } => {
                Self::InconsistentOrdering { expected, actual }
            }
            BisectError::ProbeRunner(err) => Self::ProbeRunnerFailed { err },
            BisectError::SignalHandlerSetup(err) => Self::SignalHandlerSetupError { err },
            err @ BisectError::InsufficientInformation(_) => Self::BisectFailed { err },
        }
    }
}

fn describe_cancel_reason(reason: CancelReason) -> &'static str {
    match reason {
        CancelReason::Requested => "was cancelled",
        CancelReason::Signal => "was terminated by a signal",
        CancelReason::Interrupt => "was interrupted",
    }
}
