pub mod env;
pub mod graceful;
pub mod telemetry;

#[cfg(target_family = "unix")]
pub mod os;
