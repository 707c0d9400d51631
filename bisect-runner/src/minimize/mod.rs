// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimizing the set of examples needed to reproduce failures.
//!
//! The main structure in this module is [`ExampleMinimizer`], built through a
//! [`MinimizerBuilder`]. Its progress is tracked in a [`ReproductionState`], which can be queried
//! for the best reproduction found so far at any time.

mod imp;
mod state;

pub use imp::*;
pub use state::*;
