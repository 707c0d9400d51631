// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::{
    FakeRunner, ObservedRound, RecordingListener, ids, numbered, run_bisect, run_bisect_with,
};
use bisect_runner::{
    coordinator::BisectCoordinator,
    errors::{BisectError, InsufficientInformation},
    example::{ExampleId, ProbeResult},
    minimize::MinimizeStatus,
    reporter::{CancelReason, CandidateRange, ProgressSink, RoundOutcome},
    runner::{IN_PROCESS_CAVEAT, InProcessRunner},
    signal::{CancelToken, SignalHandlerKind},
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn finds_minimal_dependencies() {
    let run = run_bisect(FakeRunner::eight_examples()).await;
    let outcome = run.outcome();

    assert_eq!(outcome.status, MinimizeStatus::Complete);
    assert_eq!(outcome.target_ids, ids(["2", "5"]));
    assert_eq!(run.minimal_ids(), ids(["1", "2", "4", "5"]));
    assert_eq!(outcome.order_dependent, Some(true));
    assert_eq!(outcome.runner_caveat, None);
    assert_eq!(outcome.original_non_failing_count, 6);
    assert_eq!(outcome.final_non_failing_count, 2);

    // The initial run, the order-dependency check, and two probes for each of three rounds.
    assert_eq!(
        run.runner.probes,
        vec![
            numbered(1..=8),
            ids(["2", "5"]),
            ids(["1", "2", "3", "4", "5"]),
            ids(["2", "5", "6", "7", "8"]),
            ids(["1", "2", "3", "5"]),
            ids(["2", "4", "5"]),
            ids(["1", "2", "4", "5"]),
            ids(["2", "3", "4", "5"]),
        ]
    );
    assert_eq!(outcome.probe_count, 7);
    assert_eq!(run.counter.probes, 7);
    assert_eq!(run.counter.rounds, 3);

    assert_eq!(
        run.listener.rounds,
        vec![
            ObservedRound {
                range: CandidateRange::new(0, 6),
                outcome: RoundOutcome::EliminatedSecond,
                remaining_count: 3,
                needed_count: 0,
            },
            ObservedRound {
                range: CandidateRange::new(0, 3),
                outcome: RoundOutcome::MultipleCulprits,
                remaining_count: 3,
                needed_count: 1,
            },
            ObservedRound {
                range: CandidateRange::new(0, 2),
                outcome: RoundOutcome::EliminatedSecond,
                remaining_count: 2,
                needed_count: 2,
            },
        ]
    );
}

#[tokio::test]
async fn order_independent_failures_skip_bisection() {
    let runner = FakeRunner::new(numbered(1..=8)).always_failing(["2"]);
    let run = run_bisect(runner).await;
    let outcome = run.outcome();

    assert_eq!(outcome.status, MinimizeStatus::Complete);
    assert_eq!(run.minimal_ids(), ids(["2"]));
    assert_eq!(outcome.order_dependent, Some(false));
    assert_eq!(outcome.final_non_failing_count, 0);
    assert_eq!(outcome.probe_count, 1);
    assert_eq!(run.counter.rounds, 0);
    assert_eq!(
        run.listener.names,
        [
            "minimization_started",
            "initial_run_complete",
            "order_dependency_check_started",
            "individual_run_started",
            "individual_run_complete",
            "order_dependency_check_complete",
            "minimization_complete",
        ]
    );
}

#[tokio::test]
async fn all_candidates_needed() {
    let runner =
        FakeRunner::new(numbered(1..=9)).depends("9", ["1", "2", "3", "4", "5", "6", "7", "8"]);
    let run = run_bisect(runner).await;

    assert_eq!(run.minimal_ids(), numbered(1..=9));
    // 1 order-dependency check, then 2 + 4 + 8 probes for rounds over 8, 4 and 2 candidates.
    assert_eq!(run.outcome().probe_count, 15);
    assert_eq!(run.counter.probes, 15);
    assert_eq!(run.counter.rounds, 7);
    assert!(
        run.listener
            .rounds
            .iter()
            .all(|round| round.outcome == RoundOutcome::MultipleCulprits)
    );
    let needed: Vec<_> = run
        .listener
        .rounds
        .iter()
        .map(|round| round.needed_count)
        .collect();
    assert_eq!(needed, [0, 0, 2, 4, 4, 6, 8]);
}

#[tokio::test]
async fn abort_returns_best_so_far() {
    let cancel_token = CancelToken::new();
    let listener = RecordingListener {
        cancel_after_rounds: Some((1, cancel_token.clone())),
        ..Default::default()
    };
    let run = run_bisect_with(FakeRunner::eight_examples(), listener, cancel_token).await;
    let outcome = run.outcome();

    assert_eq!(
        outcome.status,
        MinimizeStatus::Aborted(CancelReason::Requested)
    );
    assert_eq!(outcome.cancel_reason(), Some(CancelReason::Requested));
    assert_eq!(run.minimal_ids(), ids(["1", "2", "3", "4", "5"]));
    // The order-dependency check and the two probes of the first round.
    assert_eq!(outcome.probe_count, 3);
    assert_eq!(run.listener.names.last(), Some(&"minimization_aborted"));
}

#[tokio::test]
async fn abort_before_initial_run() {
    let cancel_token = CancelToken::new();
    cancel_token.cancel(CancelReason::Interrupt);
    let run = run_bisect_with(
        FakeRunner::eight_examples(),
        RecordingListener::default(),
        cancel_token,
    )
    .await;
    let outcome = run.outcome();

    assert_eq!(
        outcome.status,
        MinimizeStatus::Aborted(CancelReason::Interrupt)
    );
    assert_eq!(outcome.minimal_ids, Err(InsufficientInformation));
    assert!(run.runner.probes.is_empty());
}

#[tokio::test]
async fn no_failures() {
    let run = run_bisect(FakeRunner::new(numbered(1..=4))).await;

    assert!(
        matches!(run.result, Err(BisectError::NoFailures)),
        "unexpected result: {:?}",
        run.result
    );
    assert_eq!(run.runner.probes.len(), 1, "only the initial run happened");
    assert_eq!(run.counter.rounds, 0);
    assert_eq!(
        run.listener.names,
        ["minimization_started", "minimization_failed"]
    );
}

#[tokio::test]
async fn flaky_failures_are_ignored() {
    let mut runner = FakeRunner::eight_examples();
    runner.flaky.insert(ExampleId::new("7"));
    runner.flaky.insert(ExampleId::new("3"));

    let run = run_bisect(runner).await;
    assert_eq!(run.minimal_ids(), ids(["1", "2", "4", "5"]));
}

#[tokio::test]
async fn inconsistent_ordering() {
    let mut runner = FakeRunner::eight_examples();
    runner.reverse_order = true;

    let run = run_bisect(runner).await;
    match &run.result {
        Err(BisectError::InconsistentOrdering { expected, actual }) => {
            assert_eq!(expected, &ids(["2", "5"]));
            assert_eq!(actual, &ids(["5", "2"]));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(run.listener.names.last(), Some(&"minimization_failed"));
}

#[tokio::test]
async fn runner_errors_are_propagated() {
    let mut runner = FakeRunner::eight_examples();
    runner.error_on_probe = Some(3);

    let run = run_bisect(runner).await;
    match &run.result {
        Err(BisectError::ProbeRunner(error)) => {
            assert_eq!(error.to_string(), "probe 3 failed");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(run.runner.probes.len(), 4);
}

#[tokio::test]
async fn in_process_runner_caveat() {
    let fake = FakeRunner::new(numbered(1..=3)).always_failing(["2"]);
    let runner = InProcessRunner::new(fake.all_ids.clone(), move |ids: &[ExampleId]| {
        Ok(fake.evaluate(ids, false))
    });

    let coordinator = BisectCoordinator::new("", SignalHandlerKind::Noop);
    let mut sink = ProgressSink::new();
    let outcome = coordinator
        .bisect(runner, &mut sink)
        .await
        .expect("bisection succeeds");

    assert_eq!(outcome.order_dependent, Some(false));
    assert_eq!(outcome.runner_caveat, Some(IN_PROCESS_CAVEAT));
    assert_eq!(outcome.minimal_ids, Ok(ids(["2"])));
}

#[tokio::test]
async fn either_half_reproduces() {
    // `t` fails if either `a` or `b` runs before it.
    let runner = InProcessRunner::new(["a", "b", "t"], |ids: &[ExampleId]| {
        let failed = ids.iter().any(|id| id.as_str() == "a" || id.as_str() == "b");
        let failed = if failed { vec!["t"] } else { Vec::new() };
        Ok(ProbeResult::new(ids.iter().cloned(), failed))
    });

    let coordinator = BisectCoordinator::new("", SignalHandlerKind::Noop);
    let mut sink = ProgressSink::new();
    let outcome = coordinator
        .bisect(runner, &mut sink)
        .await
        .expect("bisection succeeds");

    // The first half is discarded, leaving `b` as the single needed example.
    assert_eq!(outcome.minimal_ids, Ok(ids(["b", "t"])));
    assert_eq!(outcome.probe_count, 3);
}
