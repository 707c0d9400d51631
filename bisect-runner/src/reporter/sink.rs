// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{BisectEvent, BisectEventKind, CancelReason, CandidateRange, RoundOutcome};
use crate::{
    errors::BisectError,
    example::ExampleId,
    time::{StopwatchStart, stopwatch},
};
use chrono::Local;
use indexmap::IndexSet;
use std::time::Duration;

/// A consumer of bisect events.
///
/// Every event kind has its own method with a no-op default, so listeners only need to implement
/// the events they care about. Listeners that want the whole stream, including timestamps, can
/// override [`on_event`](Self::on_event) instead.
#[allow(unused_variables)]
pub trait BisectListener {
    /// Called for every event. By default, dispatches to the per-kind methods below.
    fn on_event(&mut self, event: &BisectEvent<'_>) {
        match &event.kind {
            BisectEventKind::MinimizationStarted {
                options_description,
                runner,
            } => self.on_minimization_started(options_description, *runner),
            BisectEventKind::InitialRunComplete {
                failed_ids,
                failing_count,
                non_failing_count,
                duration,
            } => self.on_initial_run_complete(
                failed_ids,
                *failing_count,
                *non_failing_count,
                *duration,
            ),
            BisectEventKind::OrderDependencyCheckStarted => {
                self.on_order_dependency_check_started()
            }
            BisectEventKind::OrderDependencyCheckComplete {
                order_dependent,
                runner_caveat,
            } => self.on_order_dependency_check_complete(*order_dependent, *runner_caveat),
            BisectEventKind::RoundStarted {
                candidate_range,
                candidates_count,
            } => self.on_round_started(*candidate_range, *candidates_count),
            BisectEventKind::RoundFinished {
                candidate_range,
                outcome,
                remaining_count,
                needed_count,
                duration,
            } => self.on_round_finished(
                *candidate_range,
                *outcome,
                *remaining_count,
                *needed_count,
                *duration,
            ),
            BisectEventKind::IndividualRunStarted { ids } => self.on_individual_run_started(ids),
            BisectEventKind::IndividualRunComplete {
                ids,
                failed_ids,
                duration,
            } => self.on_individual_run_complete(ids, failed_ids, *duration),
            BisectEventKind::MinimizationComplete {
                original_non_failing_count,
                final_non_failing_count,
                duration,
            } => self.on_minimization_complete(
                *original_non_failing_count,
                *final_non_failing_count,
                *duration,
            ),
            BisectEventKind::MinimizationAborted {
                current_best_ids,
                reason,
            } => self.on_minimization_aborted(*current_best_ids, *reason),
            BisectEventKind::MinimizationFailed { reason } => self.on_minimization_failed(reason),
        }
    }

    /// Bisection started.
    fn on_minimization_started(&mut self, options_description: &str, runner: &'static str) {}

    /// The initial run of the full suite completed.
    fn on_initial_run_complete(
        &mut self,
        failed_ids: &IndexSet<ExampleId>,
        failing_count: usize,
        non_failing_count: usize,
        duration: Duration,
    ) {
    }

    /// The order-dependency check started.
    fn on_order_dependency_check_started(&mut self) {}

    /// The order-dependency check completed.
    fn on_order_dependency_check_complete(
        &mut self,
        order_dependent: bool,
        runner_caveat: Option<&'static str>,
    ) {
    }

    /// A bisection round started.
    fn on_round_started(&mut self, candidate_range: CandidateRange, candidates_count: usize) {}

    /// A bisection round finished.
    fn on_round_finished(
        &mut self,
        candidate_range: CandidateRange,
        outcome: RoundOutcome,
        remaining_count: usize,
        needed_count: usize,
        duration: Duration,
    ) {
    }

    /// A probe started.
    fn on_individual_run_started(&mut self, ids: &[ExampleId]) {}

    /// A probe completed.
    fn on_individual_run_complete(
        &mut self,
        ids: &[ExampleId],
        failed_ids: &IndexSet<ExampleId>,
        duration: Duration,
    ) {
    }

    /// Bisection completed.
    fn on_minimization_complete(
        &mut self,
        original_non_failing_count: usize,
        final_non_failing_count: usize,
        duration: Duration,
    ) {
    }

    /// Bisection was cancelled.
    fn on_minimization_aborted(
        &mut self,
        current_best_ids: Option<&[ExampleId]>,
        reason: CancelReason,
    ) {
    }

    /// Bisection failed.
    fn on_minimization_failed(&mut self, reason: &BisectError) {}
}

impl<T: BisectListener + ?Sized> BisectListener for &mut T {
    fn on_event(&mut self, event: &BisectEvent<'_>) {
        (**self).on_event(event)
    }
}

impl<T: BisectListener + ?Sized> BisectListener for Box<T> {
    fn on_event(&mut self, event: &BisectEvent<'_>) {
        (**self).on_event(event)
    }
}

/// Forwards bisect events to any number of listeners.
///
/// The sink stamps each event with the current time and the time elapsed since the sink was
/// created. It holds no other state: a listener never influences bisection.
pub struct ProgressSink<'a> {
    listeners: Vec<Box<dyn BisectListener + 'a>>,
    stopwatch: StopwatchStart,
}

impl<'a> ProgressSink<'a> {
    /// Creates a new sink with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            stopwatch: stopwatch(),
        }
    }

    /// Registers a listener.
    ///
    /// Pass in `&mut listener` to keep ownership of the listener, e.g. to read a counter out of
    /// it after bisection completes.
    pub fn add_listener(&mut self, listener: impl BisectListener + 'a) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Publishes an event to every registered listener, in registration order.
    pub fn publish(&mut self, kind: BisectEventKind<'_>) {
        let event = BisectEvent {
            timestamp: Local::now().fixed_offset(),
            elapsed: self.stopwatch.elapsed(),
            kind,
        };
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }
}

impl Default for ProgressSink<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressSink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("listeners", &self.listeners.len())
            .field("start_time", &self.stopwatch.start_time())
            .finish()
    }
}

/// A caller-owned counter of bisect events.
///
/// Register it with [`ProgressSink::add_listener`] as `&mut counter`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EventCounter {
    /// The number of probes started, excluding the initial run of the full suite.
    pub probes: usize,

    /// The number of bisection rounds started.
    pub rounds: usize,
}

impl BisectListener for EventCounter {
    fn on_individual_run_started(&mut self, _ids: &[ExampleId]) {
        self.probes += 1;
    }

    fn on_round_started(&mut self, _candidate_range: CandidateRange, _candidates_count: usize) {
        self.rounds += 1;
    }
}
