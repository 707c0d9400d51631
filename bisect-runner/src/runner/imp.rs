// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ProbeRunnerError, ValueParseError},
    example::{ExampleId, ProbeResult},
};
use serde::Deserialize;
use std::{fmt, future::Future, str::FromStr};

/// Runs the suite-under-test against a list of examples.
///
/// Each call to [`run`](Self::run) or [`run_full_suite`](Self::run_full_suite) is a single probe:
/// one sequential invocation of the suite. Probes are never run concurrently.
///
/// Whether examples fail is reported through the returned [`ProbeResult`], and is never an error.
/// Errors are reserved for conditions where the suite could not be run at all, or where its
/// results could not be collected.
pub trait ProbeRunner {
    /// A short, human-readable name for this runner.
    fn name(&self) -> &'static str;

    /// A caveat to attach to order-independent results, if any.
    ///
    /// Runners that don't isolate probes from each other can under-report dependencies between
    /// examples: this is the place to say so.
    fn caveat(&self) -> Option<&'static str> {
        None
    }

    /// Runs every example in the suite, in the suite's own order.
    fn run_full_suite(&mut self) -> impl Future<Output = Result<ProbeResult, ProbeRunnerError>>;

    /// Runs exactly the given examples, in the given order.
    fn run(
        &mut self,
        ids: &[ExampleId],
    ) -> impl Future<Output = Result<ProbeResult, ProbeRunnerError>>;
}

impl<R: ProbeRunner + ?Sized> ProbeRunner for &mut R {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn caveat(&self) -> Option<&'static str> {
        (**self).caveat()
    }

    fn run_full_suite(&mut self) -> impl Future<Output = Result<ProbeResult, ProbeRunnerError>> {
        (**self).run_full_suite()
    }

    fn run(
        &mut self,
        ids: &[ExampleId],
    ) -> impl Future<Output = Result<ProbeResult, ProbeRunnerError>> {
        (**self).run(ids)
    }
}

/// How example IDs are passed to the suite-under-test.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassIds {
    /// IDs are appended to the command as arguments.
    #[default]
    Args,

    /// IDs are written to a file, one per line. The path to the file is passed in through the
    /// `BISECT_EXAMPLE_IDS_FILE` environment variable.
    ///
    /// Useful for large suites where the list of IDs may exceed command-line length limits.
    File,
}

impl PassIds {
    /// String representations of all known variants.
    pub const VARIANTS: &'static [&'static str] = &["args", "file"];
}

impl FromStr for PassIds {
    type Err = ValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "args" => Ok(Self::Args),
            "file" => Ok(Self::File),
            other => Err(ValueParseError::new("pass-ids", other, Self::VARIANTS)),
        }
    }
}

impl fmt::Display for PassIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Args => write!(f, "args"),
            Self::File => write!(f, "file"),
        }
    }
}
