// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::ResultsParseError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashSet;

/// Environment variable set to `1` for every process started by the shell runner.
pub const BISECT_ENV: &str = "BISECT";

/// Environment variable naming the file the suite-under-test must write its results to.
///
/// The file must contain a JSON-serialized [`ProbeResultsSummary`].
pub const RESULTS_FILE_ENV: &str = "BISECT_RESULTS_FILE";

/// Environment variable naming a file containing the example IDs to run, one per line.
///
/// Only set if the runner is configured to pass IDs through a file. If the variable is unset and
/// no IDs are passed in as arguments, the suite-under-test is expected to run all of its examples.
pub const EXAMPLE_IDS_FILE_ENV: &str = "BISECT_EXAMPLE_IDS_FILE";

/// The results of one run of the suite-under-test.
///
/// `all_example_ids` lists every example that was run, in the order it was run.
/// `failed_example_ids` is the subset of those that failed.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ProbeResultsSummary {
    /// All examples that were run, in order.
    pub all_example_ids: Vec<SmolStr>,

    /// The examples that failed.
    #[serde(default)]
    pub failed_example_ids: Vec<SmolStr>,
}

impl ProbeResultsSummary {
    /// Parses and validates a results summary from its JSON form.
    pub fn parse_json(json: &str) -> Result<Self, ResultsParseError> {
        let summary: Self = serde_json::from_str(json).map_err(ResultsParseError::Json)?;
        summary.validate()?;
        Ok(summary)
    }

    /// Serializes this summary to a JSON string.
    pub fn to_json_string(&self) -> Result<String, ResultsParseError> {
        serde_json::to_string(self).map_err(ResultsParseError::Json)
    }

    fn validate(&self) -> Result<(), ResultsParseError> {
        let mut seen = HashSet::with_capacity(self.all_example_ids.len());
        for id in &self.all_example_ids {
            if !seen.insert(id) {
                return Err(ResultsParseError::DuplicateExample { id: id.clone() });
            }
        }
        for id in &self.failed_example_ids {
            if !seen.contains(id) {
                return Err(ResultsParseError::FailedNotRun { id: id.clone() });
            }
        }
        Ok(())
    }
}
