use std::{net::SocketAddr, num::NonZeroUsize, time::Duration};

use super::{ConnectionMode, KeySpace, WorkloadMode};

/// Concurrency levels swept when none are given.
pub const DEFAULT_CONCURRENCY_LEVELS: &[usize] = &[1, 2, 4, 8, 16, 32, 40, 45, 50];

/// Everything a sweep needs, resolved once at the boundary
/// and passed down by value.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Address of the key/value service under test.
    pub target: SocketAddr,
    pub workload: WorkloadMode,
    pub connection: ConnectionMode,
    /// Wall clock time each worker keeps issuing requests, per level.
    pub duration: Duration,
    /// Ascending, de-duplicated number of simultaneous clients per run.
    pub levels: Vec<NonZeroUsize>,
    /// Pause between two levels to let the server settle.
    pub settle: Duration,
    /// Bound on every connect, send and receive.
    pub io_timeout: Duration,
    /// Maximum number of response bytes read per exchange.
    pub read_buffer_size: usize,
    pub keyspace: KeySpace,
    /// Pre-load the hot keys before sweeping workloads that read them.
    pub warmup: bool,
}

impl SweepConfig {
    pub fn new(target: SocketAddr, workload: WorkloadMode, connection: ConnectionMode) -> Self {
        Self {
            target,
            workload,
            connection,
            duration: Duration::from_secs(30),
            levels: DEFAULT_CONCURRENCY_LEVELS
                .iter()
                .copied()
                .filter_map(NonZeroUsize::new)
                .collect(),
            settle: Duration::from_secs(2),
            io_timeout: Duration::from_secs(2),
            read_buffer_size: 4096,
            keyspace: KeySpace::default(),
            warmup: true,
        }
    }
}

/// Sort the levels ascending and drop duplicates.
pub fn normalise_levels(mut levels: Vec<NonZeroUsize>) -> Vec<NonZeroUsize> {
    levels.sort_unstable();
    levels.dedup();
    levels
}
