// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{BisectError, InsufficientInformation},
    example::{ExampleId, ProbeResult},
    reporter::{CandidateRange, RoundOutcome},
};
use indexmap::IndexSet;
use itertools::Itertools;
use tracing::{debug, warn};

/// The examples that failed in the initial run of the full suite, in suite order.
///
/// These are the failures bisection tries to reproduce. They are fixed for the lifetime of a
/// bisect run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetFailures {
    ids: IndexSet<ExampleId>,
}

impl TargetFailures {
    /// Returns the failing examples, in suite order.
    pub fn ids(&self) -> &IndexSet<ExampleId> {
        &self.ids
    }

    /// Returns the number of failing examples.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false: bisection can't start without at least one failure.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns true if `id` is one of the target failures.
    pub fn contains(&self, id: &ExampleId) -> bool {
        self.ids.contains(id)
    }

    /// Returns true if every target failure also failed in `result`.
    ///
    /// Failures of other examples are ignored: an example that passed in the initial run but
    /// fails later is flaky, and says nothing about whether the targets reproduced.
    pub fn is_reproduced_by(&self, result: &ProbeResult) -> bool {
        let reproduced = self.ids.iter().all(|id| result.has_failed(id));
        let mut flaky = result
            .failed_ids()
            .iter()
            .filter(|id| !self.ids.contains(*id))
            .peekable();
        if flaky.peek().is_some() {
            debug!(
                reproduced,
                "ignoring failures not present in the initial run: {}",
                flaky.join(", "),
            );
        }
        reproduced
    }
}

/// The status of a single non-failing example.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CandidateStatus {
    Unresolved,
    Needed,
    Discarded,
}

/// Tracks what is known about which examples are needed to reproduce the target failures.
///
/// At any point, the best reproduction found so far is the target failures, plus the examples
/// proven to be needed, plus every candidate not yet resolved. See
/// [`current_minimal_ids`](Self::current_minimal_ids).
#[derive(Clone, Debug, Default)]
pub struct ReproductionState {
    inner: Option<StateInner>,
}

#[derive(Clone, Debug)]
struct StateInner {
    suite: IndexSet<ExampleId>,
    targets: TargetFailures,
    // Non-failing examples in suite order, and the status of each.
    non_failing: Vec<ExampleId>,
    statuses: Vec<CandidateStatus>,
    // Candidate sets still to be resolved. The last element is resolved first.
    unresolved: Vec<CandidateRange>,
}

impl ReproductionState {
    /// Creates a new, uninitialized state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes the state from the initial run of the full suite.
    ///
    /// Returns [`BisectError::NoFailures`] if nothing failed.
    pub(crate) fn initialize(&mut self, initial: &ProbeResult) -> Result<(), BisectError> {
        let suite: IndexSet<_> = initial.requested_ids().iter().cloned().collect();
        if suite.len() != initial.requested_ids().len() {
            warn!("the initial run reported some examples more than once");
        }
        for id in initial.failed_ids() {
            if !suite.contains(id) {
                warn!("example `{id}` failed but was not reported as run; ignoring it");
            }
        }

        let (targets, non_failing): (Vec<_>, Vec<_>) = suite
            .iter()
            .cloned()
            .partition(|id| initial.has_failed(id));
        if targets.is_empty() {
            return Err(BisectError::NoFailures);
        }

        let statuses = vec![CandidateStatus::Unresolved; non_failing.len()];
        self.inner = Some(StateInner {
            suite,
            targets: TargetFailures {
                ids: targets.into_iter().collect(),
            },
            non_failing,
            statuses,
            unresolved: Vec::new(),
        });
        Ok(())
    }

    /// Returns true once the initial run has completed.
    pub fn is_initialized(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns the target failures.
    pub fn targets(&self) -> Result<&TargetFailures, InsufficientInformation> {
        Ok(&self.inner()?.targets)
    }

    /// Returns the best reproduction found so far, in suite order.
    ///
    /// This is valid at every point in the run: before bisection, in the middle of it, once it is
    /// complete, and after it is cancelled.
    pub fn current_minimal_ids(&self) -> Result<Vec<ExampleId>, InsufficientInformation> {
        let inner = self.inner()?;
        Ok(inner.select(|_, status| status != CandidateStatus::Discarded))
    }

    /// Returns the non-failing examples proven to be needed so far, in suite order.
    pub fn needed_ids(&self) -> Result<Vec<ExampleId>, InsufficientInformation> {
        let inner = self.inner()?;
        Ok(inner
            .non_failing
            .iter()
            .zip(&inner.statuses)
            .filter(|(_, status)| **status == CandidateStatus::Needed)
            .map(|(id, _)| id.clone())
            .collect())
    }

    /// Returns the number of non-failing examples in the initial run, or 0 if the initial run
    /// hasn't completed yet.
    pub fn original_non_failing_count(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.non_failing.len())
    }

    /// Returns the number of non-failing examples that haven't been discarded.
    pub fn remaining_count(&self) -> usize {
        self.count(|status| status != CandidateStatus::Discarded)
    }

    /// Returns the number of non-failing examples proven to be needed.
    pub fn needed_count(&self) -> usize {
        self.count(|status| status == CandidateStatus::Needed)
    }

    /// Returns true if there are no candidate sets left to resolve.
    pub fn is_resolved(&self) -> bool {
        self.inner
            .as_ref()
            .is_none_or(|inner| inner.unresolved.is_empty())
    }

    fn count(&self, f: impl Fn(CandidateStatus) -> bool) -> usize {
        self.inner.as_ref().map_or(0, |inner| {
            inner.statuses.iter().filter(|status| f(**status)).count()
        })
    }

    fn inner(&self) -> Result<&StateInner, InsufficientInformation> {
        self.inner.as_ref().ok_or(InsufficientInformation)
    }

    fn inner_mut(&mut self) -> Result<&mut StateInner, InsufficientInformation> {
        self.inner.as_mut().ok_or(InsufficientInformation)
    }

    // ---
    // Transitions used by the minimizer
    // ---

    /// Returns the target failures on their own, in suite order.
    pub(crate) fn target_ids(&self) -> Result<Vec<ExampleId>, InsufficientInformation> {
        Ok(self.inner()?.targets.ids.iter().cloned().collect())
    }

    /// Returns everything still in play except the candidates in `excluded`, in suite order.
    pub(crate) fn ids_excluding(
        &self,
        excluded: CandidateRange,
    ) -> Result<Vec<ExampleId>, InsufficientInformation> {
        let inner = self.inner()?;
        Ok(inner.select(|index, status| {
            status != CandidateStatus::Discarded && !excluded.contains(index)
        }))
    }

    /// Returns true if `ids` are ordered the same way as they were in the initial run.
    pub(crate) fn is_in_suite_order(&self, ids: &[ExampleId]) -> bool {
        self.suite_ordered(ids).as_deref() == Some(ids)
    }

    /// Returns `ids` sorted into suite order, dropping any that weren't in the initial run.
    pub(crate) fn suite_ordered(&self, ids: &[ExampleId]) -> Option<Vec<ExampleId>> {
        let inner = self.inner.as_ref()?;
        let ids: IndexSet<&ExampleId> = ids.iter().collect();
        Some(
            inner
                .suite
                .iter()
                .filter(|id| ids.contains(id))
                .cloned()
                .collect(),
        )
    }

    /// Records that the target failures reproduce on their own.
    pub(crate) fn resolve_order_independent(&mut self) -> Result<(), InsufficientInformation> {
        let inner = self.inner_mut()?;
        inner.statuses.fill(CandidateStatus::Discarded);
        inner.unresolved.clear();
        Ok(())
    }

    /// Starts bisection with every non-failing example as a single candidate set.
    pub(crate) fn begin_bisection(&mut self) -> Result<(), InsufficientInformation> {
        let inner = self.inner_mut()?;
        inner.unresolved.clear();
        inner.push_unresolved(CandidateRange::new(0, inner.non_failing.len()));
        Ok(())
    }

    /// Returns the next candidate set that needs a round of probes.
    pub(crate) fn next_round(&self) -> Option<CandidateRange> {
        self.inner.as_ref()?.unresolved.last().copied()
    }

    /// Applies the outcome of a round of probes on `range`, which must be the set returned by the
    /// last call to [`next_round`](Self::next_round).
    pub(crate) fn apply_round(&mut self, range: CandidateRange, outcome: RoundOutcome) {
        let Some(inner) = self.inner.as_mut() else {
            return;
        };
        debug_assert_eq!(
            inner.unresolved.last(),
            Some(&range),
            "round applied to the top candidate set"
        );
        inner.unresolved.pop();

        let (first, second) = range.split();
        match outcome {
            RoundOutcome::EliminatedFirst => {
                inner.discard(first);
                inner.push_unresolved(second);
            }
            RoundOutcome::EliminatedSecond => {
                inner.discard(second);
                inner.push_unresolved(first);
            }
            RoundOutcome::MultipleCulprits => {
                // Resolve the first half before the second.
                inner.push_unresolved(second);
                inner.push_unresolved(first);
            }
        }
    }
}

impl StateInner {
    /// Queues `range` for a round of probes.
    ///
    /// Empty sets are dropped, and a single candidate is needed without a probe: the round that
    /// produced it already showed that the failures don't reproduce without it.
    fn push_unresolved(&mut self, range: CandidateRange) {
        match range.len() {
            0 => {}
            1 => {
                self.statuses[range.start] = CandidateStatus::Needed;
                debug!(id = %self.non_failing[range.start], "example is needed");
            }
            _ => self.unresolved.push(range),
        }
    }

    fn discard(&mut self, range: CandidateRange) {
        for status in &mut self.statuses[range.start..range.end] {
            *status = CandidateStatus::Discarded;
        }
    }

    fn select(&self, f: impl Fn(usize, CandidateStatus) -> bool) -> Vec<ExampleId> {
        let mut index = 0;
        let mut ids = Vec::new();
        for id in &self.suite {
            if self.targets.contains(id) {
                ids.push(id.clone());
            } else {
                if f(index, self.statuses[index]) {
                    ids.push(id.clone());
                }
                index += 1;
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(ids: &[&str]) -> Vec<ExampleId> {
        ids.iter().copied().map(ExampleId::from).collect()
    }

    fn initialized(all: &[&str], failed: &[&str]) -> ReproductionState {
        let mut state = ReproductionState::new();
        state
            .initialize(&ProbeResult::new(all.iter().copied(), failed.iter().copied()))
            .expect("initial run has failures");
        state
    }

    #[test]
    fn uninitialized() {
        let state = ReproductionState::new();
        assert_eq!(state.current_minimal_ids(), Err(InsufficientInformation));
        assert!(state.targets().is_err());
        assert_eq!(state.original_non_failing_count(), 0);
        assert!(state.is_resolved());
    }

    #[test]
    fn no_failures() {
        let mut state = ReproductionState::new();
        let error = state
            .initialize(&ProbeResult::new(["1", "2"], Vec::<&str>::new()))
            .expect_err("no failures");
        assert!(matches!(error, BisectError::NoFailures), "{error:?}");
        assert!(!state.is_initialized());
    }

    #[test]
    fn initial_minimal_ids_are_whole_suite() {
        let state = initialized(&["1", "2", "3", "4", "5"], &["4", "2"]);
        assert_eq!(
            state.targets().expect("initialized").ids(),
            &ids(&["2", "4"]).into_iter().collect::<IndexSet<_>>(),
        );
        assert_eq!(
            state.current_minimal_ids(),
            Ok(ids(&["1", "2", "3", "4", "5"]))
        );
        assert_eq!(state.original_non_failing_count(), 3);
    }

    #[test]
    fn rounds_and_singletons() {
        let mut state = initialized(&["1", "2", "3", "4", "5", "6", "7", "8"], &["2", "5"]);
        state.begin_bisection().expect("initialized");

        // Non-failing: 1, 3, 4, 6, 7, 8.
        let range = state.next_round().expect("first round");
        assert_eq!(range, CandidateRange::new(0, 6));
        assert_eq!(
            state.ids_excluding(CandidateRange::new(3, 6)),
            Ok(ids(&["1", "2", "3", "4", "5"]))
        );
        state.apply_round(range, RoundOutcome::EliminatedSecond);
        assert_eq!(
            state.current_minimal_ids(),
            Ok(ids(&["1", "2", "3", "4", "5"]))
        );

        let range = state.next_round().expect("second round");
        assert_eq!(range, CandidateRange::new(0, 3));
        state.apply_round(range, RoundOutcome::MultipleCulprits);
        // The second half is the single candidate [4], which is needed right away.
        assert_eq!(state.needed_ids(), Ok(ids(&["4"])));

        let range = state.next_round().expect("third round");
        assert_eq!(range, CandidateRange::new(0, 2));
        state.apply_round(range, RoundOutcome::EliminatedSecond);

        // [1] is left on its own, so it is needed too.
        assert_eq!(state.next_round(), None);
        assert!(state.is_resolved());
        assert_eq!(state.needed_ids(), Ok(ids(&["1", "4"])));
        assert_eq!(state.current_minimal_ids(), Ok(ids(&["1", "2", "4", "5"])));
        assert_eq!(state.remaining_count(), 2);
        assert_eq!(state.needed_count(), 2);
    }

    #[test]
    fn order_independent() {
        let mut state = initialized(&["1", "2", "3"], &["2"]);
        assert_eq!(state.target_ids(), Ok(ids(&["2"])));
        state.resolve_order_independent().expect("initialized");
        assert_eq!(state.current_minimal_ids(), Ok(ids(&["2"])));
        assert_eq!(state.next_round(), None);
    }

    #[test]
    fn suite_order() {
        let state = initialized(&["a", "b", "c", "d"], &["d"]);
        assert!(state.is_in_suite_order(&ids(&["a", "c", "d"])));
        assert!(!state.is_in_suite_order(&ids(&["c", "a", "d"])));
        assert!(!state.is_in_suite_order(&ids(&["a", "z"])));
        assert_eq!(
            state.suite_ordered(&ids(&["d", "b"])),
            Some(ids(&["b", "d"]))
        );
    }

    #[test]
    fn flaky_failures_are_ignored() {
        let state = initialized(&["1", "2", "3"], &["3"]);
        let targets = state.targets().expect("initialized");

        assert!(targets.is_reproduced_by(&ProbeResult::new(["1", "3"], ["3"])));
        assert!(targets.is_reproduced_by(&ProbeResult::new(["1", "3"], ["1", "3"])));
        assert!(!targets.is_reproduced_by(&ProbeResult::new(["1", "3"], ["1"])));
        assert!(!targets.is_reproduced_by(&ProbeResult::new(["1", "3"], Vec::<&str>::new())));
    }
}
