// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands that reproduce a probe by hand.

use crate::{example::ExampleId, runner::PassIds};
use bisect_metadata::EXAMPLE_IDS_FILE_ENV;
use std::fmt;

/// The file name used for the list of IDs in [`PassIds::File`] reproduction commands.
pub const REPRO_IDS_FILE_NAME: &str = "bisect-example-ids.txt";

/// Renders shell commands that run a given list of examples.
///
/// Used to print the command for each probe in debug output, and the final minimal reproduction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReproCommand {
    command: Vec<String>,
    pass_ids: PassIds,
}

impl ReproCommand {
    /// Creates a new `ReproCommand` from a program and its arguments.
    pub fn new(command: impl IntoIterator<Item = impl Into<String>>, pass_ids: PassIds) -> Self {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            pass_ids,
        }
    }

    /// Returns the base command, without any example IDs.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Returns how IDs are passed to the command.
    pub fn pass_ids(&self) -> PassIds {
        self.pass_ids
    }

    /// Returns a displayable command that runs exactly `ids`, in order.
    pub fn for_ids<'a>(&'a self, ids: &'a [ExampleId]) -> DisplayReproCommand<'a> {
        DisplayReproCommand { repro: self, ids }
    }
}

/// A shell command for a specific list of examples.
///
/// Returned by [`ReproCommand::for_ids`].
#[derive(Clone, Copy, Debug)]
pub struct DisplayReproCommand<'a> {
    repro: &'a ReproCommand,
    ids: &'a [ExampleId],
}

impl fmt::Display for DisplayReproCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = shell_words::join(&self.repro.command);
        match self.repro.pass_ids {
            PassIds::Args => {
                let ids = shell_words::join(self.ids.iter().map(|id| id.as_str()));
                if ids.is_empty() {
                    f.write_str(&base)
                } else {
                    write!(f, "{base} {ids}")
                }
            }
            PassIds::File => {
                let ids = shell_words::join(self.ids.iter().map(|id| id.as_str()));
                write!(
                    f,
                    "printf '%s\\n' {ids} > {REPRO_IDS_FILE_NAME} && \
                     {EXAMPLE_IDS_FILE_ENV}={REPRO_IDS_FILE_NAME} {base}",
                )
            }
        }
    }
}
