//! Benchmark Configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `LATBENCH_*` environment variables (`__` separates sections,
//! e.g. `LATBENCH_BUS__SEND_INTERVAL_MS=250`).

use bus_link::BusConfig;
use latency_reporter::ReportConfig;
use serde::{Deserialize, Serialize};

/// Config file looked up when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "latency-bench.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LATBENCH";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level benchmark configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Bus wiring and timing
    pub bus: BusConfig,
    /// Reporter cadence
    pub report: ReportConfig,
    /// Logging
    pub log: LogConfig,
    /// Stop after this many frames; run until Ctrl-C when unset
    pub frames: Option<u64>,
}

/// Load configuration from defaults, `path` (if it exists) and the environment
pub fn load_config(path: &str) -> Result<BenchConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
