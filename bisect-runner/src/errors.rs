// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by test-bisect.

use crate::example::ExampleId;
use bisect_metadata::ResultsParseError;
use camino::Utf8PathBuf;
use config::ConfigError;
use itertools::Itertools;
use std::time::Duration;
use thiserror::Error;

/// An error that causes bisection to fail.
///
/// Whether an individual probe reproduces the original failures is never an error: only
/// conditions that make bisection impossible or meaningless are reported here.
#[derive(Debug, Error)]
pub enum BisectError {
    /// The initial run of the full suite did not produce any failures.
    #[error(
        "no failures found: bisect only works in the presence of one or more failing examples"
    )]
    NoFailures,

    /// A probe ran examples in an order different from the initial run.
    #[error(
        "the example ordering is inconsistent: bisect relies upon a consistent ordering \
         (e.g. a fixed seed if the suite uses random ordering) to work properly"
    )]
    InconsistentOrdering {
        /// The examples that were requested, in the order they were requested.
        expected: Vec<ExampleId>,

        /// The examples that were run, in the order they were run.
        actual: Vec<ExampleId>,
    },

    /// The probe runner failed to run the suite.
    #[error("failed to run the suite-under-test")]
    ProbeRunner(#[from] ProbeRunnerError),

    /// The signal handler could not be set up.
    #[error(transparent)]
    SignalHandlerSetup(#[from] SignalHandlerSetupError),

    /// The state of bisection was used before the initial run completed.
    #[error(transparent)]
    InsufficientInformation(#[from] InsufficientInformation),
}

/// Returned when the current minimal set of examples is requested before the initial run of the
/// suite has completed.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("not yet enough information to provide a reproduction")]
pub struct InsufficientInformation;

/// An error that occurred while a [`ProbeRunner`](crate::runner::ProbeRunner) ran the suite.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProbeRunnerError {
    /// The command to run was empty.
    #[error("no command specified to run the suite")]
    EmptyCommand,

    /// Setting up a temporary directory for the probe failed.
    #[error("failed to create temporary directory for probe")]
    TempDirCreate {
        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// Writing the list of example IDs to a file failed.
    #[error("failed to write example IDs to `{path}`")]
    WriteIds {
        /// The path that couldn't be written.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// Spawning the suite-under-test failed.
    #[error("failed to execute `{command}`")]
    Spawn {
        /// The command that was run.
        command: String,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// The suite-under-test ran past its timeout and was killed.
    #[error("`{command}` timed out after {}", display_duration(.timeout))]
    Timeout {
        /// The command that was run.
        command: String,

        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The suite-under-test exited without writing a results file.
    #[error(
        "`{command}` exited ({}) without writing results to `{path}`",
        display_exit_code(.exit_code),
    )]
    ResultsMissing {
        /// The command that was run.
        command: String,

        /// The exit code of the process, if any.
        exit_code: Option<i32>,

        /// The path that results were expected at.
        path: Utf8PathBuf,
    },

    /// Reading the results file failed.
    #[error("failed to read results from `{path}`")]
    ResultsRead {
        /// The path that couldn't be read.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// The results file could not be parsed.
    #[error("failed to parse results from `{path}`")]
    ResultsParse {
        /// The path that couldn't be parsed.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: ResultsParseError,
    },

    /// A custom runner failed.
    #[error("{message}")]
    Custom {
        /// A description of the failure.
        message: String,

        /// The underlying error, if any.
        #[source]
        error: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ProbeRunnerError {
    /// Creates a new custom error, for use by runners outside this crate.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
            error: None,
        }
    }
}

fn display_exit_code(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}

fn display_duration(duration: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse bisect config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error which indicates that a profile was requested but not known.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.iter().join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// An error that occurs while parsing a [`ReporterFormat`](crate::reporter::ReporterFormat) or a
/// [`PassIds`](crate::runner::PassIds) value from a string.
#[derive(Clone, Debug, Error)]
#[error("unrecognized value for {name}: {input}\n(known values: {})", .known.join(", "))]
pub struct ValueParseError {
    name: &'static str,
    input: String,
    known: &'static [&'static str],
}

impl ValueParseError {
    pub(crate) fn new(
        name: &'static str,
        input: impl Into<String>,
        known: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            input: input.into(),
            known,
        }
    }
}

/// An error occurred while setting up the signal handler.
#[derive(Debug, Error)]
#[error("error setting up signal handler")]
pub struct SignalHandlerSetupError(#[from] std::io::Error);

/// An error occurred while writing an event to a reporter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while serializing the event.
    #[error("error serializing event")]
    Json(#[source] serde_json::Error),
}
