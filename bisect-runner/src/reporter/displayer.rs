// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{BisectEvent, BisectEventKind, CancelReason, RoundOutcome, sink::BisectListener};
use crate::{
    errors::{ValueParseError, WriteEventError},
    example::ExampleId,
    helpers::{format_duration, plural},
    repro::ReproCommand,
};
use debug_ignore::DebugIgnore;
use itertools::Itertools;
use owo_colors::{OwoColorize, Style};
use serde::Deserialize;
use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};

/// The format used by a [`DisplayReporter`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReporterFormat {
    /// Print a dot for every probe.
    #[default]
    Progress,

    /// Print the command and failures for every probe.
    Debug,
}

impl ReporterFormat {
    /// String representations of all known variants.
    pub const VARIANTS: &'static [&'static str] = &["progress", "debug"];
}

impl FromStr for ReporterFormat {
    type Err = ValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "progress" => Ok(Self::Progress),
            "debug" => Ok(Self::Debug),
            other => Err(ValueParseError::new("format", other, Self::VARIANTS)),
        }
    }
}

impl fmt::Display for ReporterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress => write!(f, "progress"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// Writes human-readable progress for a bisect run.
#[derive(Debug)]
pub struct DisplayReporter<'a> {
    styles: Styles,
    format: ReporterFormat,
    repro: Option<ReproCommand>,
    writer: DebugIgnore<Box<dyn Write + 'a>>,
    round: usize,
    error: Option<io::Error>,
}

impl<'a> DisplayReporter<'a> {
    /// Creates a new reporter that writes to `writer`.
    pub fn new(format: ReporterFormat, writer: impl Write + 'a) -> Self {
        Self {
            styles: Styles::default(),
            format,
            repro: None,
            writer: DebugIgnore(Box::new(writer)),
            round: 0,
            error: None,
        }
    }

    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Sets the command used to describe each probe in [`ReporterFormat::Debug`] output.
    pub fn set_repro_command(&mut self, repro: ReproCommand) -> &mut Self {
        self.repro = Some(repro);
        self
    }

    /// Returns the number of rounds reported so far.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Returns the first error encountered while writing, if any.
    ///
    /// After an error, no further output is written.
    pub fn finish(self) -> Result<(), WriteEventError> {
        match self.error {
            Some(error) => Err(WriteEventError::Io(error)),
            None => Ok(()),
        }
    }

    fn write_event(&mut self, event: &BisectEvent<'_>) -> io::Result<()> {
        let styles = &self.styles;
        let writer = &mut *self.writer;
        let debug = self.format == ReporterFormat::Debug;

        match &event.kind {
            BisectEventKind::MinimizationStarted {
                options_description,
                runner,
            } => {
                writeln!(
                    writer,
                    "Bisect started using options: {} (runner: {runner})",
                    options_description.style(styles.bold),
                )?;
                write!(writer, "Running suite to find failures...")?;
            }
            BisectEventKind::InitialRunComplete {
                failed_ids,
                failing_count,
                non_failing_count,
                duration,
            } => {
                writeln!(writer, " ({})", format_duration(*duration))?;
                if debug {
                    writeln!(
                        writer,
                        " - Failing examples ({failing_count}): {}",
                        failed_ids.iter().join(", ")
                    )?;
                }
                writeln!(
                    writer,
                    "Starting bisect with {} failing {} and {} non-failing {}.",
                    failing_count.style(styles.fail),
                    plural::examples_str(*failing_count),
                    non_failing_count.style(styles.bold),
                    plural::examples_str(*non_failing_count),
                )?;
            }
            BisectEventKind::OrderDependencyCheckStarted => {
                write!(writer, "Checking that failures are order-dependent...")?;
            }
            BisectEventKind::OrderDependencyCheckComplete {
                order_dependent,
                runner_caveat,
            } => {
                if *order_dependent {
                    writeln!(writer, " failure appears to be order-dependent")?;
                } else {
                    writeln!(
                        writer,
                        " {}",
                        "failures do not require any non-failures to run first"
                            .style(styles.pass),
                    )?;
                    if let Some(caveat) = runner_caveat {
                        writeln!(writer, "\n{}: {caveat}", "note".style(styles.warning))?;
                    }
                }
            }
            BisectEventKind::RoundStarted {
                candidate_range,
                candidates_count,
            } => {
                self.round += 1;
                write!(
                    writer,
                    "\n{} {}: bisecting over non-failing examples {candidate_range}",
                    "Round".style(styles.bold),
                    self.round.style(styles.bold),
                )?;
                if debug {
                    writeln!(writer, " (of {candidates_count})")?;
                }
            }
            BisectEventKind::RoundFinished {
                candidate_range,
                outcome,
                remaining_count,
                needed_count,
                duration,
            } => {
                let (first, second) = candidate_range.split();
                match outcome {
                    RoundOutcome::EliminatedFirst | RoundOutcome::EliminatedSecond => {
                        let ignored = if *outcome == RoundOutcome::EliminatedFirst {
                            first
                        } else {
                            second
                        };
                        write!(
                            writer,
                            " ignoring {} {ignored}",
                            plural::examples_str(ignored.len()),
                        )?;
                    }
                    RoundOutcome::MultipleCulprits => {
                        write!(
                            writer,
                            " {}",
                            "multiple culprits detected; splitting candidates"
                                .style(styles.warning),
                        )?;
                    }
                }
                writeln!(writer, " ({})", format_duration(*duration))?;
                if debug {
                    writeln!(
                        writer,
                        " - {remaining_count} non-failing {} remaining, {needed_count} needed",
                        plural::examples_str(*remaining_count),
                    )?;
                }
            }
            BisectEventKind::IndividualRunStarted { ids } => {
                if debug {
                    write!(writer, "\n - Running: ")?;
                    match &self.repro {
                        Some(repro) => write!(writer, "{}", repro.for_ids(ids))?,
                        None => write!(writer, "{}", ids.iter().join(" "))?,
                    }
                } else {
                    write!(writer, ".")?;
                }
            }
            BisectEventKind::IndividualRunComplete {
                ids: _,
                failed_ids,
                duration,
            } => {
                if debug {
                    writeln!(writer, " ({})", format_duration(*duration))?;
                    if failed_ids.is_empty() {
                        writeln!(writer, "    - Failures: (none)")?;
                    } else {
                        writeln!(
                            writer,
                            "    - Failures: {}",
                            failed_ids.iter().join(", ").style(styles.fail),
                        )?;
                    }
                }
                writer.flush()?;
            }
            BisectEventKind::MinimizationComplete {
                original_non_failing_count,
                final_non_failing_count,
                duration,
            } => {
                writeln!(
                    writer,
                    "\n{} Reduced necessary non-failing examples from {} to {} in {}.",
                    "Bisect complete!".style(styles.pass),
                    original_non_failing_count.style(styles.bold),
                    final_non_failing_count.style(styles.bold),
                    format_duration(*duration),
                )?;
            }
            BisectEventKind::MinimizationAborted {
                current_best_ids,
                reason,
            } => {
                writeln!(
                    writer,
                    "\n\n{} ({})",
                    "Bisect aborted!".style(styles.fail),
                    describe_cancel_reason(*reason),
                )?;
                if current_best_ids.is_none() {
                    writeln!(
                        writer,
                        "No failures found yet, so there is no reproduction to report."
                    )?;
                }
            }
            BisectEventKind::MinimizationFailed { reason } => {
                writeln!(
                    writer,
                    "\n{} {reason}",
                    "Bisect failed:".style(styles.fail),
                )?;
            }
        }

        Ok(())
    }
}

impl BisectListener for DisplayReporter<'_> {
    fn on_event(&mut self, event: &BisectEvent<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.write_event(event) {
            self.error = Some(error);
        }
    }
}

fn describe_cancel_reason(reason: CancelReason) -> &'static str {
    match reason {
        CancelReason::Requested => "cancelled",
        CancelReason::Signal => "received termination signal",
        CancelReason::Interrupt => "interrupted",
    }
}

/// Writes a list of example IDs, one per line, in the format used for final reproductions.
pub fn write_ids(ids: &[ExampleId], mut writer: impl Write) -> io::Result<()> {
    for id in ids {
        writeln!(writer, "  {id}")?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Styles {
    bold: Style,
    pass: Style,
    fail: Style,
    warning: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.bold = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.warning = Style::new().yellow().bold();
    }
}
