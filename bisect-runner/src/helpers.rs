// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for bisect-runner.

use std::time::Duration;

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "example" if `count` is 1, otherwise "examples".
    pub fn examples_str(count: usize) -> &'static str {
        if count == 1 { "example" } else { "examples" }
    }

    /// Returns "probe" if `count` is 1, otherwise "probes".
    pub fn probes_str(count: usize) -> &'static str {
        if count == 1 { "probe" } else { "probes" }
    }
}

/// Formats a duration with three digits of precision, in seconds.
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.3}s")
    } else {
        let mins = duration.as_secs() / 60;
        let rem = secs - (mins * 60) as f64;
        format!("{mins}m {rem:.3}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Duration::from_millis(0), "0.000s"; "zero")]
    #[test_case(Duration::from_millis(1500), "1.500s"; "seconds")]
    #[test_case(Duration::from_millis(61_250), "1m 1.250s"; "minutes")]
    fn format_duration_cases(duration: Duration, expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }
}
