use std::io::Write;

use crate::{cmd::run::coordinator::RunResult, config::SweepConfig};

use super::{Reporter, WarmupReport};

/// One JSON object per line, for machine consumption.
pub struct JsonlReporter<W = std::io::Stdout> {
    out: W,
    runs: usize,
    total_requests: u64,
}

impl JsonlReporter {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }
}

impl Default for JsonlReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> JsonlReporter<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            runs: 0,
            total_requests: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: serde_json::Value) -> std::io::Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}

impl<W: Write + Send + 'static> Reporter for JsonlReporter<W> {
    fn on_start(&mut self, cfg: &SweepConfig) -> std::io::Result<()> {
        self.emit(serde_json::json!({
            "type": "start",
            "target": cfg.target.to_string(),
            "workload": cfg.workload.as_str(),
            "connection": cfg.connection.as_str(),
            "duration_ms": cfg.duration.as_millis() as u64,
            "levels": cfg.levels.iter().map(|l| l.get()).collect::<Vec<_>>(),
        }))
    }

    fn on_warmup(&mut self, report: &WarmupReport) -> std::io::Result<()> {
        self.emit(serde_json::json!({
            "type": "warmup",
            "keys_loaded": report.keys_loaded,
            "keys_total": report.keys_total,
            "elapsed_ms": report.elapsed.as_millis() as u64,
        }))
    }

    fn on_run(&mut self, result: &RunResult) -> std::io::Result<()> {
        self.runs += 1;
        self.total_requests += result.total_requests;
        self.emit(serde_json::json!({
            "type": "run",
            "clients": result.clients.get(),
            "requests": result.total_requests,
            "actual_duration_ms": result.actual_duration.as_millis() as u64,
            "throughput_rps": result.throughput,
            "mean_latency_ms": result.mean_latency_ms,
        }))
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.emit(serde_json::json!({
            "type": "final",
            "runs": self.runs,
            "requests": self.total_requests,
        }))
    }
}
