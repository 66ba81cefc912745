mod keyspace;
mod server;
mod sweep;
mod workload;

pub use self::{
    keyspace::KeySpace,
    server::ServerConfig,
    sweep::{DEFAULT_CONCURRENCY_LEVELS, SweepConfig, normalise_levels},
    workload::{ConnectionMode, WorkloadMode},
};
