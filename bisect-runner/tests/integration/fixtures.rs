// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use bisect_runner::{
    coordinator::{BisectCoordinator, BisectOutcome},
    errors::{BisectError, ProbeRunnerError},
    example::{ExampleId, ProbeResult},
    reporter::{
        BisectEvent, BisectEventKind, BisectListener, CancelReason, CandidateRange, EventCounter,
        ProgressSink, RoundOutcome,
    },
    runner::ProbeRunner,
    signal::{CancelToken, SignalHandlerKind},
};
use indexmap::{IndexMap, IndexSet};

pub(crate) fn ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<ExampleId> {
    ids.into_iter().map(ExampleId::from).collect()
}

pub(crate) fn numbered(range: std::ops::RangeInclusive<u32>) -> Vec<ExampleId> {
    range.map(|n| ExampleId::new(n.to_string())).collect()
}

/// A suite whose failures are fully determined by which examples are run.
///
/// * Examples in `always_failing` fail whenever they run.
/// * Each key of `dependent_failures` fails if it runs along with every example in its value.
#[derive(Clone, Debug, Default)]
pub(crate) struct FakeRunner {
    pub(crate) all_ids: Vec<ExampleId>,
    pub(crate) always_failing: IndexSet<ExampleId>,
    pub(crate) dependent_failures: IndexMap<ExampleId, IndexSet<ExampleId>>,
    /// Examples reported as failing in every probe after the initial run.
    pub(crate) flaky: IndexSet<ExampleId>,
    /// Report examples in the reverse of the order they were requested in.
    pub(crate) reverse_order: bool,
    /// Fail the nth probe (0 = the initial run) with an error.
    pub(crate) error_on_probe: Option<usize>,
    pub(crate) probes: Vec<Vec<ExampleId>>,
}

impl FakeRunner {
    pub(crate) fn new(all_ids: Vec<ExampleId>) -> Self {
        Self {
            all_ids,
            ..Default::default()
        }
    }

    pub(crate) fn always_failing<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.always_failing
            .extend(ids.into_iter().map(ExampleId::from));
        self
    }

    pub(crate) fn depends<'a>(
        mut self,
        failing: &str,
        upon: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.dependent_failures.insert(
            ExampleId::from(failing),
            upon.into_iter().map(ExampleId::from).collect(),
        );
        self
    }

    /// The suite used throughout: 8 examples, `2` always fails, and `5` fails iff `1` and `4` run.
    pub(crate) fn eight_examples() -> Self {
        Self::new(numbered(1..=8))
            .always_failing(["2"])
            .depends("5", ["1", "4"])
    }

    /// Returns what running `ids` would produce, without recording a probe.
    pub(crate) fn evaluate(&self, ids: &[ExampleId], is_initial: bool) -> ProbeResult {
        let present: IndexSet<&ExampleId> = ids.iter().collect();
        let failed = ids.iter().filter(|id| {
            if self.always_failing.contains(*id) {
                return true;
            }
            if !is_initial && self.flaky.contains(*id) {
                return true;
            }
            self.dependent_failures
                .get(*id)
                .is_some_and(|upon| upon.iter().all(|dep| present.contains(dep)))
        });
        let failed: Vec<_> = failed.cloned().collect();

        let mut requested = ids.to_vec();
        if self.reverse_order && !is_initial {
            requested.reverse();
        }
        ProbeResult::new(requested, failed)
    }

    fn record(&mut self, ids: &[ExampleId]) -> Result<(), ProbeRunnerError> {
        let index = self.probes.len();
        self.probes.push(ids.to_vec());
        if self.error_on_probe == Some(index) {
            return Err(ProbeRunnerError::custom(format!("probe {index} failed")));
        }
        Ok(())
    }
}

impl ProbeRunner for FakeRunner {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn run_full_suite(&mut self) -> Result<ProbeResult, ProbeRunnerError> {
        let all_ids = self.all_ids.clone();
        self.record(&all_ids)?;
        Ok(self.evaluate(&all_ids, true))
    }

    async fn run(&mut self, ids: &[ExampleId]) -> Result<ProbeResult, ProbeRunnerError> {
        self.record(ids)?;
        Ok(self.evaluate(ids, false))
    }
}

/// A round of bisection, as observed through events.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ObservedRound {
    pub(crate) range: CandidateRange,
    pub(crate) outcome: RoundOutcome,
    pub(crate) remaining_count: usize,
    pub(crate) needed_count: usize,
}

/// Records event names and rounds, and optionally cancels after a given number of rounds.
#[derive(Debug, Default)]
pub(crate) struct RecordingListener {
    pub(crate) names: Vec<&'static str>,
    pub(crate) rounds: Vec<ObservedRound>,
    pub(crate) cancel_after_rounds: Option<(usize, CancelToken)>,
}

impl BisectListener for RecordingListener {
    fn on_event(&mut self, event: &BisectEvent<'_>) {
        self.names.push(event.kind.name());
        if let BisectEventKind::RoundFinished {
            candidate_range,
            outcome,
            remaining_count,
            needed_count,
            duration: _,
        } = &event.kind
        {
            self.rounds.push(ObservedRound {
                range: *candidate_range,
                outcome: *outcome,
                remaining_count: *remaining_count,
                needed_count: *needed_count,
            });
            if let Some((after, token)) = &self.cancel_after_rounds {
                if self.rounds.len() >= *after {
                    token.cancel(CancelReason::Requested);
                }
            }
        }
    }
}

/// The results of a bisect run against a [`FakeRunner`].
#[derive(Debug)]
pub(crate) struct BisectRun {
    pub(crate) result: Result<BisectOutcome, BisectError>,
    pub(crate) runner: FakeRunner,
    pub(crate) counter: EventCounter,
    pub(crate) listener: RecordingListener,
}

impl BisectRun {
    pub(crate) fn outcome(&self) -> &BisectOutcome {
        match &self.result {
            Ok(outcome) => outcome,
            Err(error) => panic!("bisection failed: {error}"),
        }
    }

    pub(crate) fn minimal_ids(&self) -> Vec<ExampleId> {
        self.outcome()
            .minimal_ids
            .clone()
            .expect("initial run completed")
    }
}

pub(crate) async fn run_bisect(runner: FakeRunner) -> BisectRun {
    run_bisect_with(runner, RecordingListener::default(), CancelToken::new()).await
}

pub(crate) async fn run_bisect_with(
    mut runner: FakeRunner,
    mut listener: RecordingListener,
    cancel_token: CancelToken,
) -> BisectRun {
    let mut coordinator = BisectCoordinator::new("--seed 1234", SignalHandlerKind::Noop);
    coordinator.set_cancel_token(cancel_token);

    let mut counter = EventCounter::default();
    let result = {
        let mut sink = ProgressSink::new();
        sink.add_listener(&mut counter).add_listener(&mut listener);
        coordinator.bisect(&mut runner, &mut sink).await
    };

    BisectRun {
        result,
        runner,
        counter,
        listener,
    }
}

/// Runs a future to completion on a fresh single-threaded runtime, for use within proptests.
pub(crate) fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime built")
        .block_on(fut)
}
