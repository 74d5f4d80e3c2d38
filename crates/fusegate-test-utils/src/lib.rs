// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! fusegate test utilities
//!
//! - `#[logged_test]` / `#[logged_tokio_test]`: one log file per test,
//!   minimal stdout on success, log path and size on failure.
//! - [`SimulatedBackend`]: a recording HTTP backend on an ephemeral port.

// Lets the attribute macros' `::fusegate_test_utils` paths resolve inside this crate.
extern crate self as fusegate_test_utils;

pub mod backend;
pub mod guard;
pub mod logging;
pub mod macros;

pub use backend::{BackendReply, RecordedRequest, SimulatedBackend};
pub use fusegate_test_utils_macros::{logged_test, logged_tokio_test};
pub use guard::TestLoggerGuard;
pub use logging::{create_unique_test_log, TestLogError, TestLogger};
