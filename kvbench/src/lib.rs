//! Load generation harness for line-oriented TCP key/value services.
//!
//! The `run` command sweeps a list of concurrency levels against a target,
//! while `mock` serves a small in-memory key/value store speaking the same
//! protocol so the harness can be tried without the real server.

#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod cmd;
pub mod config;
pub mod protocol;
pub mod utils;
