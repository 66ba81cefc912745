use std::fmt;

use crate::protocol::{DIRECTIVE_CLOSE, DIRECTIVE_KEEP_ALIVE};

/// Read/write/delete mix applied to generated requests.
///
/// Selected once per sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum WorkloadMode {
    /// Reads over a small hot key range.
    /// Models a cache friendly workload.
    #[value(name = "GET_POPULAR", alias = "get-popular")]
    GetPopular,

    /// Reads over the full cold key range.
    /// Models a cache unfriendly working set.
    #[value(name = "GET_ALL", alias = "get-all")]
    GetAll,

    /// Writes of large values over the full cold key range.
    #[value(name = "PUT_ALL", alias = "put-all")]
    PutAll,

    /// 50% reads, 40% small writes and 10% deletes
    /// over the full cold key range.
    #[value(name = "GET_PUT_MIX", alias = "get-put-mix")]
    GetPutMix,
}

impl WorkloadMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            WorkloadMode::GetPopular => "GET_POPULAR",
            WorkloadMode::GetAll => "GET_ALL",
            WorkloadMode::PutAll => "PUT_ALL",
            WorkloadMode::GetPutMix => "GET_PUT_MIX",
        }
    }

    /// Only the hot key workload benefits from pre-loading its keys.
    pub const fn wants_warmup(self) -> bool {
        matches!(self, WorkloadMode::GetPopular)
    }
}

impl fmt::Display for WorkloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection reuse strategy of the simulated clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ConnectionMode {
    /// One long lived connection per client.
    #[value(name = "KEEP_ALIVE", alias = "keep-alive")]
    KeepAlive,

    /// A fresh connection for every single request.
    #[value(name = "CLOSE")]
    Close,
}

impl ConnectionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ConnectionMode::KeepAlive => "KEEP_ALIVE",
            ConnectionMode::Close => "CLOSE",
        }
    }

    /// Value of the `Connection` header line embedded in generated requests.
    pub const fn directive(self) -> &'static str {
        match self {
            ConnectionMode::KeepAlive => DIRECTIVE_KEEP_ALIVE,
            ConnectionMode::Close => DIRECTIVE_CLOSE,
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
