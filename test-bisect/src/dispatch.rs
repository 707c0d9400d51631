// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, StderrStyles, clap_styles},
};
use bisect_metadata::BisectExitCode;
use bisect_runner::{
    config::{BisectConfig, BisectProfile},
    coordinator::{BisectCoordinator, BisectOutcome},
    plural,
    repro::ReproCommand,
    reporter::{
        BisectEvent, BisectListener, DisplayReporter, ProgressSink, ReporterFormat,
        StructuredReporter, write_ids,
    },
    runner::{PassIds, ShellRunner},
    signal::SignalHandlerKind,
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, ValueEnum};
use owo_colors::OwoColorize;
use std::{
    io::{self, Write},
    time::Duration,
};
use swrite::{SWrite, swrite};
use tracing::debug;

/// Find the minimal set of examples needed to reproduce an order-dependent failure.
///
/// The suite is run once in full, then repeatedly with subsets of the examples that passed,
/// until removing any more of them makes the failures go away.
#[derive(Debug, Parser)]
#[command(
    version,
    about,
    max_term_width = 100,
    styles = clap_styles::style(),
    after_help = "Example:\n  test-bisect --format debug -- bundle exec rspec --seed 1234"
)]
pub struct TestBisectApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(flatten)]
    run_opts: RunOpts,

    /// Command that runs the suite, followed by its arguments
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

impl TestBisectApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code on success.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        let cwd = current_dir()?;
        let config = BisectConfig::from_sources(&cwd, self.config_opts.config_file.as_deref())?;
        let profile = config.profile(&self.config_opts.profile)?;
        let settings = BisectSettings::resolve(&profile, &self.run_opts, self.command)?;
        debug!(
            "using profile `{}` from `{}`: {settings:?}",
            profile.name(),
            config.config_file(),
        );

        let mut runner = ShellRunner::new(&settings.command)?;
        runner.set_pass_ids(settings.pass_ids).set_current_dir(cwd.clone());
        if let Some(timeout) = settings.probe_timeout {
            runner.set_timeout(timeout);
        }
        let repro = runner.repro_command();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| ExpectedError::RuntimeCreate { error })?;
        let coordinator =
            BisectCoordinator::new(settings.options_description(), SignalHandlerKind::Standard);

        let message_format = self.run_opts.message_format;
        let mut reporter = match message_format {
            MessageFormat::Human => {
                let mut reporter = DisplayReporter::new(settings.format, io::stderr());
                if output.color.should_colorize(supports_color::Stream::Stderr) {
                    reporter.colorize();
                }
                reporter.set_repro_command(repro.clone());
                Reporter::Human(reporter)
            }
            MessageFormat::Json => Reporter::Json(StructuredReporter::new(io::stdout())),
        };

        let result = {
            let mut sink = ProgressSink::new();
            sink.add_listener(&mut reporter);
            runtime.block_on(coordinator.bisect(runner, &mut sink))
        };
        reporter.finish()?;
        let outcome = result?;

        // The summary goes wherever progress output doesn't.
        let written = match message_format {
            MessageFormat::Human => write_summary(
                &outcome,
                &repro,
                &output.summary_styles(supports_color::Stream::Stdout),
                io::stdout().lock(),
            ),
            MessageFormat::Json => write_summary(
                &outcome,
                &repro,
                &output.stderr_styles(),
                io::stderr().lock(),
            ),
        };
        written.map_err(|err| ExpectedError::WriteSummaryError { err })?;

        match outcome.cancel_reason() {
            Some(reason) => Err(ExpectedError::bisect_interrupted(reason)),
            None => Ok(BisectExitCode::OK),
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: .config/bisect.toml in the current directory]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Configuration profile to use
    #[arg(
        long,
        short = 'P',
        env = "BISECT_PROFILE",
        value_name = "PROFILE",
        default_value = BisectConfig::DEFAULT_PROFILE
    )]
    profile: String,
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Bisect options")]
struct RunOpts {
    /// How example IDs are passed to the command: args, file
    #[arg(long, value_name = "MODE")]
    pass_ids: Option<PassIds>,

    /// Kill a run of the suite that takes longer than this (e.g. "10m")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    probe_timeout: Option<Duration>,

    /// Progress output: progress (a dot per run) or debug (the command and failures of each run)
    #[arg(long, value_name = "FORMAT")]
    format: Option<ReporterFormat>,

    /// Format for progress messages
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormat,
}

/// The format progress messages are written in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
enum MessageFormat {
    /// Human-readable output, written to stderr.
    #[default]
    Human,

    /// One JSON object per line, written to stdout.
    Json,
}

/// Settings for a run, with command-line options layered over the profile.
#[derive(Clone, Debug, Eq, PartialEq)]
struct BisectSettings {
    command: Vec<String>,
    pass_ids: PassIds,
    probe_timeout: Option<Duration>,
    format: ReporterFormat,
}

impl BisectSettings {
    fn resolve(
        profile: &BisectProfile<'_>,
        run_opts: &RunOpts,
        command: Vec<String>,
    ) -> Result<Self> {
        let command = if command.is_empty() {
            profile.command().to_vec()
        } else {
            command
        };
        if command.is_empty() {
            return Err(ExpectedError::no_command(profile.name()));
        }

        Ok(Self {
            command,
            pass_ids: run_opts.pass_ids.unwrap_or_else(|| profile.pass_ids()),
            probe_timeout: run_opts.probe_timeout.or_else(|| profile.probe_timeout()),
            format: run_opts.format.unwrap_or_else(|| profile.format()),
        })
    }

    fn options_description(&self) -> String {
        let mut description = shell_words::join(&self.command);
        if self.pass_ids == PassIds::File {
            description.push_str(" (example IDs passed via file)");
        }
        if let Some(timeout) = self.probe_timeout {
            swrite!(
                description,
                " (timeout: {})",
                humantime::format_duration(timeout)
            );
        }
        description
    }
}

enum Reporter<'a> {
    Human(DisplayReporter<'a>),
    Json(StructuredReporter<'a>),
}

impl Reporter<'_> {
    fn finish(self) -> Result<()> {
        match self {
            Self::Human(reporter) => reporter.finish()?,
            Self::Json(reporter) => reporter.finish()?,
        }
        Ok(())
    }
}

impl BisectListener for Reporter<'_> {
    fn on_event(&mut self, event: &BisectEvent<'_>) {
        match self {
            Self::Human(reporter) => reporter.on_event(event),
            Self::Json(reporter) => reporter.on_event(event),
        }
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|error| ExpectedError::CurrentDirInvalid { error })?;
    Utf8PathBuf::try_from(cwd)
        .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { path: err.into_path_buf() })
}

/// Writes the reproduction found by a bisect run.
fn write_summary(
    outcome: &BisectOutcome,
    repro: &ReproCommand,
    styles: &StderrStyles,
    mut writer: impl Write,
) -> io::Result<()> {
    // Cancelled before the initial run finished: nothing to report.
    let Ok(ids) = &outcome.minimal_ids else {
        return Ok(());
    };

    let heading = match (outcome.cancel_reason(), outcome.order_dependent) {
        (Some(_), _) => "The most minimal reproduction command discovered so far is:",
        (None, Some(false)) => {
            "The failures do not depend on other examples. Reproduce them with:"
        }
        (None, _) => "The minimal reproduction command is:",
    };
    writeln!(writer, "\n{}", heading.style(styles.bold))?;
    writeln!(writer, "  {}", repro.for_ids(ids))?;

    let failing_count = outcome.target_ids.len();
    let needed_count = ids.len() - failing_count;
    writeln!(
        writer,
        "\n{} failing {} and {} non-failing {} ({} {}):",
        failing_count.style(styles.count),
        plural::examples_str(failing_count),
        needed_count.style(styles.count),
        plural::examples_str(needed_count),
        outcome.probe_count.style(styles.count),
        plural::probes_str(outcome.probe_count),
    )?;
    write_ids(ids, &mut writer)?;

    if let Some(caveat) = outcome.runner_caveat {
        writeln!(writer, "\n{}", caveat.style(styles.warning_text))?;
    }

    writer.flush()
}
