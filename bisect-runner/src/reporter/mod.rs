// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report the progress of a bisect run in human and machine-readable formats.
//!
//! Events flow from the minimizer into a [`ProgressSink`], which forwards them to any number of
//! [`BisectListener`]s. [`DisplayReporter`] and [`StructuredReporter`] are the two listeners
//! provided here.

mod displayer;
mod events;
mod sink;
mod structured;

pub use displayer::*;
pub use events::*;
pub use sink::*;
pub use structured::*;
