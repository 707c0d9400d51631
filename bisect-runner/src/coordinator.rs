// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level orchestration of a bisect run.

use crate::{
    errors::{BisectError, InsufficientInformation},
    example::ExampleId,
    minimize::{MinimizeStatus, MinimizerBuilder},
    reporter::{BisectEventKind, CancelReason, ProgressSink},
    runner::ProbeRunner,
    signal::{CancelToken, SignalHandlerKind},
    time::stopwatch,
};
use std::time::Duration;

/// Wires a [`ProbeRunner`] to an [`ExampleMinimizer`](crate::minimize::ExampleMinimizer), and
/// relays the start and end of bisection to a [`ProgressSink`].
#[derive(Clone, Debug)]
pub struct BisectCoordinator {
    options_description: String,
    signal_handler: SignalHandlerKind,
    cancel_token: CancelToken,
}

impl BisectCoordinator {
    /// Creates a new coordinator.
    ///
    /// `options_description` is a human-readable summary of how bisection was configured, and is
    /// passed through to the `minimization_started` event.
    pub fn new(options_description: impl Into<String>, signal_handler: SignalHandlerKind) -> Self {
        Self {
            options_description: options_description.into(),
            signal_handler,
            cancel_token: CancelToken::new(),
        }
    }

    /// Returns the token that cancels bisection runs started by this coordinator.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel_token
    }

    /// Sets the token that cancels bisection runs started by this coordinator.
    pub fn set_cancel_token(&mut self, cancel_token: CancelToken) -> &mut Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Runs bisection to completion or cancellation.
    ///
    /// Errors are published as a `minimization_failed` event before being returned.
    pub async fn bisect<R: ProbeRunner>(
        &self,
        runner: R,
        sink: &mut ProgressSink<'_>,
    ) -> Result<BisectOutcome, BisectError> {
        let start = stopwatch();
        sink.publish(BisectEventKind::MinimizationStarted {
            options_description: &self.options_description,
            runner: runner.name(),
        });

        let mut minimizer = match MinimizerBuilder::new()
            .set_cancel_token(self.cancel_token.clone())
            .build(runner, self.signal_handler)
        {
            Ok(minimizer) => minimizer,
            Err(error) => {
                let error = BisectError::from(error);
                sink.publish(BisectEventKind::MinimizationFailed { reason: &error });
                return Err(error);
            }
        };

        let status = match minimizer.minimize(sink).await {
            Ok(status) => status,
            Err(error) => {
                sink.publish(BisectEventKind::MinimizationFailed { reason: &error });
                return Err(error);
            }
        };

        let state = minimizer.state();
        let minimal_ids = state.current_minimal_ids();
        let duration = start.elapsed();
        match status {
            MinimizeStatus::Complete => {
                sink.publish(BisectEventKind::MinimizationComplete {
                    original_non_failing_count: state.original_non_failing_count(),
                    final_non_failing_count: state.remaining_count(),
                    duration,
                });
            }
            MinimizeStatus::Aborted(reason) => {
                sink.publish(BisectEventKind::MinimizationAborted {
                    current_best_ids: minimal_ids.as_deref().ok(),
                    reason,
                });
            }
        }

        Ok(BisectOutcome {
            status,
            target_ids: state
                .targets()
                .map(|targets| targets.ids().iter().cloned().collect())
                .unwrap_or_default(),
            minimal_ids,
            original_non_failing_count: state.original_non_failing_count(),
            final_non_failing_count: state.remaining_count(),
            probe_count: minimizer.probe_count(),
            order_dependent: minimizer.order_dependent(),
            runner_caveat: match minimizer.order_dependent() {
                Some(false) => minimizer.runner().caveat(),
                _ => None,
            },
            duration,
        })
    }
}

/// The result of a bisect run that didn't fail.
#[derive(Clone, Debug)]
pub struct BisectOutcome {
    /// Whether bisection completed or was cancelled.
    pub status: MinimizeStatus,

    /// The examples that failed in the initial run, in suite order.
    pub target_ids: Vec<ExampleId>,

    /// The smallest reproduction found, in suite order.
    ///
    /// If bisection was cancelled, this is the best reproduction found so far. It is only an
    /// error if cancellation happened before the initial run completed.
    pub minimal_ids: Result<Vec<ExampleId>, InsufficientInformation>,

    /// The number of non-failing examples in the initial run.
    pub original_non_failing_count: usize,

    /// The number of non-failing examples in the reproduction.
    pub final_non_failing_count: usize,

    /// The number of probes issued, not counting the initial run.
    pub probe_count: usize,

    /// Whether the failures depend on other examples, if that was determined.
    pub order_dependent: Option<bool>,

    /// If the failures are order-independent, a caveat supplied by the probe runner.
    pub runner_caveat: Option<&'static str>,

    /// How long bisection took.
    pub duration: Duration,
}

impl BisectOutcome {
    /// Returns the reason bisection was cancelled, if it was.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self.status {
            MinimizeStatus::Complete => None,
            MinimizeStatus::Aborted(reason) => Some(reason),
        }
    }
}
