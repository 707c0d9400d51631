// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Finds the minimal set of examples needed to reproduce an order-dependent test failure.
//!
//! This crate contains the command-line interface. The bisection logic itself lives in
//! `bisect-runner`.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
