use std::time::Duration;

use crate::config::SweepConfig;

use super::coordinator::RunResult;

mod human;
mod json;

pub use self::{human::HumanReporter, json::JsonlReporter};

/// Receives the progress of a sweep and renders it.
pub trait Reporter: Send + 'static {
    fn on_start(&mut self, cfg: &SweepConfig) -> std::io::Result<()>;
    fn on_warmup(&mut self, report: &WarmupReport) -> std::io::Result<()>;
    fn on_run(&mut self, result: &RunResult) -> std::io::Result<()>;
    fn finish(&mut self) -> std::io::Result<()>;
}

/// How far pre-loading the hot keys got before the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupReport {
    pub keys_loaded: u64,
    pub keys_total: u64,
    pub elapsed: Duration,
}

impl WarmupReport {
    pub fn is_complete(&self) -> bool {
        self.keys_loaded == self.keys_total
    }
}
