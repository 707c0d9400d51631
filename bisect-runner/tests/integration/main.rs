// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for bisect-runner.

mod fixtures;
mod minimize;
mod properties;
#[cfg(unix)]
mod shell_runner;
