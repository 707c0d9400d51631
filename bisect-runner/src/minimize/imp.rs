// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ReproductionState;
use crate::{
    errors::{BisectError, InsufficientInformation, ProbeRunnerError, SignalHandlerSetupError},
    example::{ExampleId, ProbeResult},
    reporter::{BisectEventKind, CancelReason, ProgressSink, RoundOutcome},
    runner::ProbeRunner,
    signal::{CancelToken, SignalHandler, SignalHandlerKind},
    time::stopwatch,
};
use std::{future::Future, ops::ControlFlow};
use tracing::{debug, info};

/// Builder for [`ExampleMinimizer`].
#[derive(Clone, Debug, Default)]
pub struct MinimizerBuilder {
    cancel_token: Option<CancelToken>,
}

impl MinimizerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the token used to cancel bisection. By default, a new token is created.
    pub fn set_cancel_token(&mut self, cancel_token: CancelToken) -> &mut Self {
        self.cancel_token = Some(cancel_token);
        self
    }

    /// Creates a new minimizer that drives `runner`.
    pub fn build<R: ProbeRunner>(
        &self,
        runner: R,
        signal_handler: SignalHandlerKind,
    ) -> Result<ExampleMinimizer<R>, SignalHandlerSetupError> {
        Ok(ExampleMinimizer {
            runner,
            state: ReproductionState::new(),
            cancel_token: self.cancel_token.clone().unwrap_or_default(),
            signal_handler: signal_handler.build()?,
            probe_count: 0,
            order_dependent: None,
        })
    }
}

/// How a call to [`ExampleMinimizer::minimize`] ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MinimizeStatus {
    /// Every candidate was resolved.
    Complete,

    /// Bisection was cancelled between two probes.
    Aborted(CancelReason),
}

/// Finds the smallest set of examples that reproduces the failures of a suite.
///
/// Exactly one probe is in flight at any time. Signals received while a probe is running request
/// cancellation, which takes effect once that probe completes. The result of that probe is
/// discarded, so the state is never updated from an interrupted run.
#[derive(Debug)]
pub struct ExampleMinimizer<R> {
    runner: R,
    state: ReproductionState,
    cancel_token: CancelToken,
    signal_handler: SignalHandler,
    probe_count: usize,
    order_dependent: Option<bool>,
}

impl<R: ProbeRunner> ExampleMinimizer<R> {
    /// Returns the probe runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns the state of bisection so far.
    pub fn state(&self) -> &ReproductionState {
        &self.state
    }

    /// Returns a token that can be used to cancel bisection.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel_token
    }

    /// Returns the best reproduction found so far, in suite order.
    pub fn current_minimal_ids(&self) -> Result<Vec<ExampleId>, InsufficientInformation> {
        self.state.current_minimal_ids()
    }

    /// Returns the number of probes issued, not counting the initial run of the full suite.
    pub fn probe_count(&self) -> usize {
        self.probe_count
    }

    /// Returns whether the failures turned out to depend on other examples, if that is known yet.
    pub fn order_dependent(&self) -> Option<bool> {
        self.order_dependent
    }

    /// Runs the full suite, checks whether its failures depend on other examples, and if so,
    /// bisects the non-failing examples until no further reduction is possible.
    ///
    /// Cancellation is not an error: [`MinimizeStatus::Aborted`] is returned, and the best
    /// reproduction found so far remains available through
    /// [`current_minimal_ids`](Self::current_minimal_ids). A probe that fails after cancellation
    /// was requested also results in [`MinimizeStatus::Aborted`].
    pub async fn minimize(
        &mut self,
        sink: &mut ProgressSink<'_>,
    ) -> Result<MinimizeStatus, BisectError> {
        if let Some(reason) = self.cancel_token.reason() {
            return Ok(MinimizeStatus::Aborted(reason));
        }

        let start = stopwatch();
        let initial = run_until_signal(
            &mut self.signal_handler,
            &self.cancel_token,
            self.runner.run_full_suite(),
        )
        .await;
        let initial = match self.check_cancelled(initial)? {
            ControlFlow::Continue(result) => result,
            ControlFlow::Break(reason) => return Ok(MinimizeStatus::Aborted(reason)),
        };
        self.state.initialize(&initial)?;
        let targets = self.state.targets()?;
        sink.publish(BisectEventKind::InitialRunComplete {
            failed_ids: targets.ids(),
            failing_count: targets.len(),
            non_failing_count: self.state.original_non_failing_count(),
            duration: start.elapsed(),
        });

        if let Some(reason) = self.cancel_token.reason() {
            return Ok(MinimizeStatus::Aborted(reason));
        }
        match self.check_order_dependency(sink).await? {
            ControlFlow::Continue(true) => {}
            ControlFlow::Continue(false) => return Ok(MinimizeStatus::Complete),
            ControlFlow::Break(reason) => return Ok(MinimizeStatus::Aborted(reason)),
        }

        self.state.begin_bisection()?;
        self.bisect(sink).await
    }

    /// Runs the target failures on their own. Returns true if they did not reproduce, i.e. the
    /// failures depend on other examples.
    async fn check_order_dependency(
        &mut self,
        sink: &mut ProgressSink<'_>,
    ) -> Result<ControlFlow<CancelReason, bool>, BisectError> {
        sink.publish(BisectEventKind::OrderDependencyCheckStarted);

        let ids = self.state.target_ids()?;
        let reproduces = match self.reproduces(&ids, sink).await? {
            ControlFlow::Continue(reproduces) => reproduces,
            ControlFlow::Break(reason) => return Ok(ControlFlow::Break(reason)),
        };
        let order_dependent = !reproduces;
        self.order_dependent = Some(order_dependent);

        let runner_caveat = if order_dependent {
            None
        } else {
            self.state.resolve_order_independent()?;
            self.runner.caveat()
        };
        sink.publish(BisectEventKind::OrderDependencyCheckComplete {
            order_dependent,
            runner_caveat,
        });
        Ok(ControlFlow::Continue(order_dependent))
    }

    async fn bisect(&mut self, sink: &mut ProgressSink<'_>) -> Result<MinimizeStatus, BisectError> {
        let candidates_count = self.state.original_non_failing_count();

        while let Some(range) = self.state.next_round() {
            if let Some(reason) = self.cancel_token.reason() {
                return Ok(MinimizeStatus::Aborted(reason));
            }

            let round_start = stopwatch();
            sink.publish(BisectEventKind::RoundStarted {
                candidate_range: range,
                candidates_count,
            });

            // Probe A keeps the first half, probe B keeps the second.
            let (first, second) = range.split();
            let ids = self.state.ids_excluding(second)?;
            let first_reproduces = match self.reproduces(&ids, sink).await? {
                ControlFlow::Continue(reproduces) => reproduces,
                ControlFlow::Break(reason) => return Ok(MinimizeStatus::Aborted(reason)),
            };

            if let Some(reason) = self.cancel_token.reason() {
                return Ok(MinimizeStatus::Aborted(reason));
            }
            let ids = self.state.ids_excluding(first)?;
            let second_reproduces = match self.reproduces(&ids, sink).await? {
                ControlFlow::Continue(reproduces) => reproduces,
                ControlFlow::Break(reason) => return Ok(MinimizeStatus::Aborted(reason)),
            };

            let outcome = match (first_reproduces, second_reproduces) {
                (true, false) => RoundOutcome::EliminatedSecond,
                (false, true) => RoundOutcome::EliminatedFirst,
                (true, true) => {
                    debug!(
                        "failures reproduced with either half of {range} removed; \
                         discarding the first half"
                    );
                    RoundOutcome::EliminatedFirst
                }
                (false, false) => RoundOutcome::MultipleCulprits,
            };
            self.state.apply_round(range, outcome);

            sink.publish(BisectEventKind::RoundFinished {
                candidate_range: range,
                outcome,
                remaining_count: self.state.remaining_count(),
                needed_count: self.state.needed_count(),
                duration: round_start.elapsed(),
            });
        }

        Ok(MinimizeStatus::Complete)
    }

    async fn reproduces(
        &mut self,
        ids: &[ExampleId],
        sink: &mut ProgressSink<'_>,
    ) -> Result<ControlFlow<CancelReason, bool>, BisectError> {
        let result = match self.probe(ids, sink).await? {
            ControlFlow::Continue(result) => result,
            ControlFlow::Break(reason) => return Ok(ControlFlow::Break(reason)),
        };
        Ok(ControlFlow::Continue(
            self.state.targets()?.is_reproduced_by(&result),
        ))
    }

    /// Runs a single probe.
    ///
    /// If cancellation was requested while the probe ran, its result is not used: the suite may
    /// have been interrupted too, and its results are incomplete.
    async fn probe(
        &mut self,
        ids: &[ExampleId],
        sink: &mut ProgressSink<'_>,
    ) -> Result<ControlFlow<CancelReason, ProbeResult>, BisectError> {
        sink.publish(BisectEventKind::IndividualRunStarted { ids });
        let start = stopwatch();
        self.probe_count += 1;

        let result = run_until_signal(
            &mut self.signal_handler,
            &self.cancel_token,
            self.runner.run(ids),
        )
        .await;
        let result = match self.check_cancelled(result)? {
            ControlFlow::Continue(result) => result,
            ControlFlow::Break(reason) => return Ok(ControlFlow::Break(reason)),
        };

        if !self.state.is_in_suite_order(result.requested_ids()) {
            return Err(BisectError::InconsistentOrdering {
                expected: self
                    .state
                    .suite_ordered(result.requested_ids())
                    .unwrap_or_default(),
                actual: result.requested_ids().to_vec(),
            });
        }

        let duration = start.elapsed();
        debug!(
            probe = self.probe_count,
            ids = ids.len(),
            failed = result.failed_ids().len(),
            ?duration,
            "probe complete",
        );
        sink.publish(BisectEventKind::IndividualRunComplete {
            ids,
            failed_ids: result.failed_ids(),
            duration,
        });
        Ok(ControlFlow::Continue(result))
    }

    /// Discards the outcome of a run that finished after cancellation was requested.
    fn check_cancelled(
        &self,
        result: Result<ProbeResult, ProbeRunnerError>,
    ) -> Result<ControlFlow<CancelReason, ProbeResult>, BisectError> {
        match (self.cancel_token.reason(), result) {
            (Some(reason), Err(error)) => {
                debug!("ignoring probe error after cancellation: {error}");
                Ok(ControlFlow::Break(reason))
            }
            (Some(reason), Ok(_)) => Ok(ControlFlow::Break(reason)),
            (None, Ok(result)) => Ok(ControlFlow::Continue(result)),
            (None, Err(error)) => Err(error.into()),
        }
    }
}

/// Awaits `fut` to completion. Signals received in the meantime request cancellation, but don't
/// interrupt `fut`.
async fn run_until_signal<T>(
    signal_handler: &mut SignalHandler,
    cancel_token: &CancelToken,
    fut: impl Future<Output = T>,
) -> T {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            output = &mut fut => break output,
            Some(event) = signal_handler.recv() => {
                info!("received {event:?}, stopping after the current probe completes");
                cancel_token.cancel(event.cancel_reason());
            }
        }
    }
}
