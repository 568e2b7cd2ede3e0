//! End-to-end tests for memo-runner.
//!
//! These tests exercise the full `memo-run` binary via subprocess. They catch
//! startup failures, config resolution errors, and full-flow regressions that
//! unit and integration tests miss.
//!
//! # Running
//!
//! ```sh
//! cargo test --test e2e
//! ```
//!
//! The generator is replaced by a `sh` script, so no model or GPU is needed.

#![cfg(unix)]

mod harness;

mod cli;
mod errors;
mod generate;
