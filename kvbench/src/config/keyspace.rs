/// Key ranges and value sizes used to generate requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::Args)]
pub struct KeySpace {
    /// Size of the hot key range `[1, N]` used by `GET_POPULAR`.
    #[arg(long, value_name = "N", default_value_t = KeySpace::DEFAULT.hot_keys,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub hot_keys: u64,

    /// Size of the cold key range `[1, N]` used by all other workloads.
    #[arg(long, value_name = "N", default_value_t = KeySpace::DEFAULT.cold_keys,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub cold_keys: u64,

    /// Size in bytes of the value written by `PUT_ALL`.
    #[arg(long, value_name = "BYTES", default_value_t = KeySpace::DEFAULT.value_size)]
    pub value_size: usize,
}

impl KeySpace {
    pub const DEFAULT: Self = Self {
        hot_keys: 50,
        cold_keys: 10_000_000,
        value_size: 512,
    };
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::DEFAULT
    }
}
