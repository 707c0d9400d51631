// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ProbeRunner;
use crate::{
    errors::ProbeRunnerError,
    example::{ExampleId, ProbeResult},
};
use debug_ignore::DebugIgnore;

/// The caveat attached to order-independent results produced by an [`InProcessRunner`].
pub const IN_PROCESS_CAVEAT: &str = "examples were run in-process, so state left behind by one \
     probe may leak into the next and mask dependencies between examples; consider re-running \
     with the shell runner to confirm";

/// Runs the suite-under-test through a closure, within the current process.
///
/// The closure is called with the list of examples to run, in order. For the full-suite probe it
/// is called with every example the runner was created with.
#[derive(Debug)]
pub struct InProcessRunner<F> {
    all_ids: Vec<ExampleId>,
    run_fn: DebugIgnore<F>,
}

impl<F> InProcessRunner<F>
where
    F: FnMut(&[ExampleId]) -> Result<ProbeResult, ProbeRunnerError>,
{
    /// Creates a new `InProcessRunner` for a suite consisting of `all_ids`, in order.
    pub fn new(all_ids: impl IntoIterator<Item = impl Into<ExampleId>>, run_fn: F) -> Self {
        Self {
            all_ids: all_ids.into_iter().map(Into::into).collect(),
            run_fn: DebugIgnore(run_fn),
        }
    }

    /// Returns every example in the suite, in order.
    pub fn all_ids(&self) -> &[ExampleId] {
        &self.all_ids
    }
}

impl<F> ProbeRunner for InProcessRunner<F>
where
    F: FnMut(&[ExampleId]) -> Result<ProbeResult, ProbeRunnerError>,
{
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn caveat(&self) -> Option<&'static str> {
        Some(IN_PROCESS_CAVEAT)
    }

    async fn run_full_suite(&mut self) -> Result<ProbeResult, ProbeRunnerError> {
        (self.run_fn.0)(&self.all_ids)
    }

    async fn run(&mut self, ids: &[ExampleId]) -> Result<ProbeResult, ProbeRunnerError> {
        (self.run_fn.0)(ids)
    }
}
