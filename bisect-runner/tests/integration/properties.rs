// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Properties that hold for any suite where a single target fails iff a fixed set of other
//! examples runs along with it.

use crate::fixtures::{FakeRunner, block_on, run_bisect};
use bisect_runner::example::ExampleId;
use proptest::{collection::vec, prelude::*};
use test_strategy::proptest;

const TARGET: &str = "target";

/// Builds a suite with one candidate per element of `required`, followed by the target. The
/// target fails iff every candidate marked as required runs. Optionally, the first candidate
/// always fails as well.
fn conjunctive_suite(
    required: &[bool],
    always_failing_first: bool,
) -> (FakeRunner, Vec<ExampleId>) {
    let candidates: Vec<String> = (0..required.len()).map(|n| format!("example-{n}")).collect();
    let mut needed: Vec<ExampleId> = candidates
        .iter()
        .zip(required)
        .filter(|(_, required)| **required)
        .map(|(id, _)| ExampleId::new(id))
        .collect();

    let mut all_ids: Vec<ExampleId> = candidates.iter().map(ExampleId::new).collect();
    all_ids.push(ExampleId::new(TARGET));
    let mut runner = FakeRunner::new(all_ids).depends(TARGET, needed.iter().map(|id| id.as_str()));
    if always_failing_first {
        if let Some(first) = candidates.first() {
            runner = runner.always_failing([first.as_str()]);
            // A failing example is a target, not a candidate.
            needed.retain(|id| id.as_str() != first);
        }
    }

    (runner, needed)
}

#[proptest(cases = 64)]
fn minimal_set_is_sound_and_exact(
    #[strategy(vec(any::<bool>(), 1..16))] required: Vec<bool>,
    always_failing_first: bool,
) {
    let (runner, needed) = conjunctive_suite(&required, always_failing_first);
    let run = block_on(run_bisect(runner.clone()));
    let minimal = run.minimal_ids();
    let targets = run.outcome().target_ids.clone();

    // Soundness: running the minimal set reproduces every target failure.
    let result = runner.evaluate(&minimal, false);
    for target in &targets {
        prop_assert!(result.has_failed(target), "{target} reproduces");
    }

    // Exactness: with a single conjunctive dependency, exactly the required examples are kept.
    let kept: Vec<ExampleId> = minimal
        .iter()
        .filter(|id| !targets.contains(id))
        .cloned()
        .collect();
    prop_assert_eq!(kept, needed);
}

#[proptest(cases = 32)]
fn bisection_is_idempotent(#[strategy(vec(any::<bool>(), 1..16))] required: Vec<bool>) {
    let (runner, _) = conjunctive_suite(&required, false);
    let first = block_on(run_bisect(runner.clone()));
    let second = block_on(run_bisect(runner));

    prop_assert_eq!(first.minimal_ids(), second.minimal_ids());
    prop_assert_eq!(first.runner.probes, second.runner.probes);
}

#[proptest(cases = 64)]
fn rounds_are_monotonic(#[strategy(vec(any::<bool>(), 1..24))] required: Vec<bool>) {
    let (runner, _) = conjunctive_suite(&required, false);
    let run = block_on(run_bisect(runner));

    let mut remaining = run.outcome().original_non_failing_count;
    let mut needed = 0;
    for round in &run.listener.rounds {
        prop_assert!(round.remaining_count <= remaining, "remaining never grows");
        prop_assert!(round.needed_count >= needed, "needed never shrinks");
        prop_assert!(round.needed_count <= round.remaining_count);
        remaining = round.remaining_count;
        needed = round.needed_count;
    }
    prop_assert!(run.outcome().final_non_failing_count <= remaining);
    prop_assert_eq!(run.counter.probes, run.outcome().probe_count);
    prop_assert_eq!(run.counter.probes, 1 + 2 * run.counter.rounds);
}
