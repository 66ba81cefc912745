/// Behavior of the mock key/value server.
#[derive(Debug, Clone, clap::Args)]
pub struct ServerConfig {
    /// Maximum number of entries kept in the in-memory store.
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub cache_size: u64,

    /// Base processing time before responding.
    #[arg(long, value_name = "SECONDS")]
    pub base_latency: Option<f64>,

    /// Random delay added to or removed from base_latency.
    /// Models IO waits and backend variability.
    #[arg(long, value_name = "SECONDS")]
    pub jitter: Option<f64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cache_size: 100,
            base_latency: None,
            jitter: None,
        }
    }
}
