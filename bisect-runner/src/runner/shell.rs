// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{PassIds, ProbeRunner};
use crate::{
    errors::ProbeRunnerError,
    example::{ExampleId, ProbeResult},
    repro::ReproCommand,
};
use bisect_metadata::{BISECT_ENV, EXAMPLE_IDS_FILE_ENV, ProbeResultsSummary, RESULTS_FILE_ENV};
use camino::{Utf8Path, Utf8PathBuf};
use std::{io, process::Stdio, time::Duration};
use tracing::debug;

const RESULTS_FILE_NAME: &str = "results.json";
const IDS_FILE_NAME: &str = "example-ids.txt";

/// Runs the suite-under-test as a separate process for every probe.
///
/// The process is told where to write its results through the `BISECT_RESULTS_FILE` environment
/// variable, and must write a JSON-serialized [`ProbeResultsSummary`] there. A non-zero exit status
/// is expected whenever examples fail, and is not treated as an error.
#[derive(Clone, Debug)]
pub struct ShellRunner {
    program: String,
    args: Vec<String>,
    pass_ids: PassIds,
    timeout: Option<Duration>,
    cwd: Option<Utf8PathBuf>,
}

impl ShellRunner {
    /// Creates a new `ShellRunner` from a program and its arguments.
    ///
    /// Returns an error if `command` is empty.
    pub fn new(
        command: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, ProbeRunnerError> {
        let mut command = command.into_iter().map(Into::into);
        let program = command.next().ok_or(ProbeRunnerError::EmptyCommand)?;
        Ok(Self {
            program,
            args: command.collect(),
            pass_ids: PassIds::default(),
            timeout: None,
            cwd: None,
        })
    }

    /// Sets how example IDs are passed to the suite.
    pub fn set_pass_ids(&mut self, pass_ids: PassIds) -> &mut Self {
        self.pass_ids = pass_ids;
        self
    }

    /// Sets a timeout for each probe. The process is killed if it runs for longer than this.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the directory the suite is run in. Defaults to the current directory.
    pub fn set_current_dir(&mut self, cwd: impl Into<Utf8PathBuf>) -> &mut Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Returns a [`ReproCommand`] that runs examples the same way this runner does.
    pub fn repro_command(&self) -> ReproCommand {
        ReproCommand::new(
            std::iter::once(&self.program).chain(&self.args).cloned(),
            self.pass_ids,
        )
    }

    fn display_command(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(&self.args))
    }

    async fn run_ids(&self, ids: Option<&[ExampleId]>) -> Result<ProbeResult, ProbeRunnerError> {
        let temp_dir = camino_tempfile::Builder::new()
            .prefix("test-bisect-")
            .tempdir()
            .map_err(|error| ProbeRunnerError::TempDirCreate { error })?;
        let results_path = temp_dir.path().join(RESULTS_FILE_NAME);

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .env(BISECT_ENV, "1")
            .env(RESULTS_FILE_ENV, &results_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        // Terminal interrupts go to test-bisect only, and the suite runs to completion.
        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(ids) = ids {
            match self.pass_ids {
                PassIds::Args => {
                    cmd.args(ids.iter().map(|id| id.as_str()));
                }
                PassIds::File => {
                    let ids_path = temp_dir.path().join(IDS_FILE_NAME);
                    write_ids_file(&ids_path, ids).await?;
                    cmd.env(EXAMPLE_IDS_FILE_ENV, &ids_path);
                }
            }
        }

        let command = self.display_command();
        debug!(
            command = %command,
            ids = ids.map_or(0, |ids| ids.len()),
            "spawning suite-under-test",
        );

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| ProbeRunnerError::Timeout {
                    command: command.clone(),
                    timeout,
                })?,
            None => cmd.output().await,
        }
        .map_err(|error| ProbeRunnerError::Spawn {
            command: command.clone(),
            error,
        })?;

        debug!(
            exit_code = ?output.status.code(),
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "suite-under-test exited",
        );

        let contents = match tokio::fs::read_to_string(&results_path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(ProbeRunnerError::ResultsMissing {
                    command,
                    exit_code: output.status.code(),
                    path: results_path,
                });
            }
            Err(error) => {
                return Err(ProbeRunnerError::ResultsRead {
                    path: results_path,
                    error,
                });
            }
        };

        let summary = ProbeResultsSummary::parse_json(&contents).map_err(|error| {
            ProbeRunnerError::ResultsParse {
                path: results_path.clone(),
                error,
            }
        })?;

        Ok(summary.into())
    }
}

async fn write_ids_file(path: &Utf8Path, ids: &[ExampleId]) -> Result<(), ProbeRunnerError> {
    let mut contents = String::new();
    for id in ids {
        contents.push_str(id.as_str());
        contents.push('\n');
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|error| ProbeRunnerError::WriteIds {
            path: path.to_owned(),
            error,
        })
}

impl ProbeRunner for ShellRunner {
    fn name(&self) -> &'static str {
        "shell"
    }

    async fn run_full_suite(&mut self) -> Result<ProbeResult, ProbeRunnerError> {
        self.run_ids(None).await
    }

    async fn run(&mut self, ids: &[ExampleId]) -> Result<ProbeResult, ProbeRunnerError> {
        self.run_ids(Some(ids)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command() {
        let error = ShellRunner::new(Vec::<String>::new()).expect_err("empty command is rejected");
        assert!(matches!(error, ProbeRunnerError::EmptyCommand));
    }

    #[test]
    fn repro_command_matches_runner() {
        let mut runner = ShellRunner::new(["bin/rspec", "--seed", "1234"]).expect("valid command");
        runner.set_pass_ids(PassIds::File);

        let repro = runner.repro_command();
        assert_eq!(repro.command(), ["bin/rspec", "--seed", "1234"]);
        assert_eq!(repro.pass_ids(), PassIds::File);
    }
}
