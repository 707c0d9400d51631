// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Example identifiers and the results of running them.

use bisect_metadata::ProbeResultsSummary;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, fmt};

/// An opaque identifier for an example in the suite-under-test.
///
/// Example IDs are only ever compared for equality; their contents are not interpreted.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ExampleId(SmolStr);

impl ExampleId {
    /// Creates a new example ID.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the ID as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ExampleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ExampleId {
    fn from(id: String) -> Self {
        Self(SmolStr::from(id))
    }
}

impl From<SmolStr> for ExampleId {
    fn from(id: SmolStr) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ExampleId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for ExampleId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ExampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a single run of the suite-under-test: a probe.
///
/// Produced by a [`ProbeRunner`](crate::runner::ProbeRunner).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProbeResult {
    requested_ids: Vec<ExampleId>,
    failed_ids: IndexSet<ExampleId>,
}

impl ProbeResult {
    /// Creates a new probe result.
    ///
    /// `requested_ids` is the list of examples that were actually run, in the order they were run.
    pub fn new(
        requested_ids: impl IntoIterator<Item = impl Into<ExampleId>>,
        failed_ids: impl IntoIterator<Item = impl Into<ExampleId>>,
    ) -> Self {
        Self {
            requested_ids: requested_ids.into_iter().map(Into::into).collect(),
            failed_ids: failed_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the examples that were run, in the order they were run.
    pub fn requested_ids(&self) -> &[ExampleId] {
        &self.requested_ids
    }

    /// Returns the examples that failed.
    pub fn failed_ids(&self) -> &IndexSet<ExampleId> {
        &self.failed_ids
    }

    /// Returns true if the given example failed in this probe.
    pub fn has_failed(&self, id: &ExampleId) -> bool {
        self.failed_ids.contains(id)
    }
}

impl From<ProbeResultsSummary> for ProbeResult {
    fn from(summary: ProbeResultsSummary) -> Self {
        Self::new(summary.all_example_ids, summary.failed_example_ids)
    }
}
