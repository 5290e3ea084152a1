// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Unit tests for the chaos admission engine
//!
//! This module contains tests for:
//! - Leaf parsers (durations, status codes, rates, sizes, cron)
//! - Per-kind action rules through the dispatcher
//! - Selector mode/value rules and namespace defaulting
//! - Schedule and Workflow validation
//! - The admission HTTP endpoints
//! - The schedule migration tool
//! - End-to-end admission scenarios

#[path = "../common/mod.rs"]
mod common;

mod dispatcher;
mod kinds;
mod leaf;
mod migration;
mod scenarios;
mod schedule;
mod selectors;
mod server;
mod workflow;
