// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{BisectEvent, BisectEventKind, sink::BisectListener};
use crate::errors::WriteEventError;
use debug_ignore::DebugIgnore;
use serde_json::{Value, json};
use std::io::Write;

/// Writes every bisect event as a single line of JSON.
///
/// Each object has `type`, `timestamp` (RFC 3339) and `elapsed` (in seconds) fields, followed by
/// the fields of the event itself. Durations are in seconds.
#[derive(Debug)]
pub struct StructuredReporter<'a> {
    writer: DebugIgnore<Box<dyn Write + 'a>>,
    error: Option<WriteEventError>,
}

impl<'a> StructuredReporter<'a> {
    /// Creates a new reporter that writes to `writer`.
    pub fn new(writer: impl Write + 'a) -> Self {
        Self {
            writer: DebugIgnore(Box::new(writer)),
            error: None,
        }
    }

    /// Returns the first error encountered while writing, if any.
    pub fn finish(self) -> Result<(), WriteEventError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn write_event(&mut self, event: &BisectEvent<'_>) -> Result<(), WriteEventError> {
        let mut value = json!({
            "type": event.kind.name(),
            "timestamp": event.timestamp.to_rfc3339(),
            "elapsed": event.elapsed.as_secs_f64(),
        });
        if let (Value::Object(map), Value::Object(fields)) = (&mut value, event_fields(&event.kind))
        {
            map.extend(fields);
        }

        serde_json::to_writer(&mut *self.writer, &value).map_err(WriteEventError::Json)?;
        writeln!(self.writer).map_err(WriteEventError::Io)?;
        self.writer.flush().map_err(WriteEventError::Io)
    }
}

impl BisectListener for StructuredReporter<'_> {
    fn on_event(&mut self, event: &BisectEvent<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.write_event(event) {
            self.error = Some(error);
        }
    }
}

fn event_fields(kind: &BisectEventKind<'_>) -> Value {
    match kind {
        BisectEventKind::MinimizationStarted {
            options_description,
            runner,
        } => json!({
            "options_description": options_description,
            "runner": runner,
        }),
        BisectEventKind::InitialRunComplete {
            failed_ids,
            failing_count,
            non_failing_count,
            duration,
        } => json!({
            "failed_ids": failed_ids,
            "failing_count": failing_count,
            "non_failing_count": non_failing_count,
            "duration": duration.as_secs_f64(),
        }),
        BisectEventKind::OrderDependencyCheckStarted => json!({}),
        BisectEventKind::OrderDependencyCheckComplete {
            order_dependent,
            runner_caveat,
        } => json!({
            "order_dependent": order_dependent,
            "runner_caveat": runner_caveat,
        }),
        BisectEventKind::RoundStarted {
            candidate_range,
            candidates_count,
        } => json!({
            "candidate_range": candidate_range.to_string(),
            "candidates_count": candidates_count,
        }),
        BisectEventKind::RoundFinished {
            candidate_range,
            outcome,
            remaining_count,
            needed_count,
            duration,
        } => json!({
            "candidate_range": candidate_range.to_string(),
            "outcome": outcome.to_static_str(),
            "remaining_count": remaining_count,
            "needed_count": needed_count,
            "duration": duration.as_secs_f64(),
        }),
        BisectEventKind::IndividualRunStarted { ids } => json!({ "ids": ids }),
        BisectEventKind::IndividualRunComplete {
            ids,
            failed_ids,
            duration,
        } => json!({
            "ids": ids,
            "failed_ids": failed_ids,
            "duration": duration.as_secs_f64(),
        }),
        BisectEventKind::MinimizationComplete {
            original_non_failing_count,
            final_non_failing_count,
            duration,
        } => json!({
            "original_non_failing_count": original_non_failing_count,
            "final_non_failing_count": final_non_failing_count,
            "duration": duration.as_secs_f64(),
        }),
        BisectEventKind::MinimizationAborted {
            current_best_ids,
            reason,
        } => json!({
            "current_best_ids": current_best_ids,
            "reason": reason.to_static_str(),
        }),
        BisectEventKind::MinimizationFailed { reason } => json!({
            "reason": reason.to_string(),
        }),
    }
}
