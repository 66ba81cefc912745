use std::io::Write;

use crate::{cmd::run::coordinator::RunResult, config::SweepConfig};

use super::{Reporter, WarmupReport};

const RULE_WIDTH: usize = 80;

/// Aligned table for humans, one row per concurrency level.
pub struct HumanReporter<W = std::io::Stdout> {
    out: W,
    header_written: bool,
}

impl HumanReporter {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }
}

impl Default for HumanReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> HumanReporter<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_table_header(&mut self) -> std::io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(
            self.out,
            "{:<10} | {:<10} | {:<14} | {:<15}",
            "CLIENTS", "REQUESTS", "THROUGHPUT", "AVG LATENCY (ms)"
        )?;
        writeln!(self.out, "{}", "-".repeat(RULE_WIDTH))
    }
}

impl<W: Write + Send + 'static> Reporter for HumanReporter<W> {
    fn on_start(&mut self, cfg: &SweepConfig) -> std::io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "--- STARTING BENCHMARK ---")?;
        writeln!(self.out, "Target:     {}", cfg.target)?;
        writeln!(self.out, "Workload:   {}", cfg.workload)?;
        writeln!(self.out, "Connection: {}", cfg.connection)?;
        writeln!(self.out, "Duration:   {:.1}s per level", cfg.duration.as_secs_f64())
    }

    fn on_warmup(&mut self, report: &WarmupReport) -> std::io::Result<()> {
        if report.is_complete() {
            writeln!(
                self.out,
                "   [Warmup] Pre-loaded {} keys in {:.2}s",
                report.keys_loaded,
                report.elapsed.as_secs_f64()
            )
        } else {
            writeln!(
                self.out,
                "   [Warmup] Pre-loaded only {} of {} keys",
                report.keys_loaded, report.keys_total
            )
        }
    }

    fn on_run(&mut self, result: &RunResult) -> std::io::Result<()> {
        if !self.header_written {
            self.write_table_header()?;
            self.header_written = true;
        }
        writeln!(
            self.out,
            "{:<10} | {:<10} | {:<10.2} RPS | {:.2} ms",
            result.clients, result.total_requests, result.throughput, result.mean_latency_ms
        )?;
        self.out.flush()
    }

    fn finish(&mut self) -> std::io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Benchmark Complete.")?;
        self.out.flush()
    }
}
