// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use smol_str::SmolStr;
use std::{error, fmt};

/// An error that occurs while reading a [`ProbeResultsSummary`](crate::ProbeResultsSummary).
#[derive(Debug)]
#[non_exhaustive]
pub enum ResultsParseError {
    /// Error parsing JSON.
    Json(serde_json::Error),

    /// The same example was reported as run more than once.
    DuplicateExample {
        /// The duplicated example ID.
        id: SmolStr,
    },

    /// An example was reported as failed, but not as run.
    FailedNotRun {
        /// The example ID that was reported as failed.
        id: SmolStr,
    },
}

impl fmt::Display for ResultsParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Json(_) => {
                write!(f, "parsing results JSON failed")
            }
            Self::DuplicateExample { id } => {
                write!(f, "example `{id}` was reported as run more than once")
            }
            Self::FailedNotRun { id } => {
                write!(
                    f,
                    "example `{id}` was reported as failed, but is missing from all-example-ids"
                )
            }
        }
    }
}

impl error::Error for ResultsParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::DuplicateExample { .. } | Self::FailedNotRun { .. } => None,
        }
    }
}
