use crate::coordinator::SCAN_INTERVAL;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENTRY_STORE_PATH: &str = "smartthings_energy.json";

/// Runtime configuration, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ha_url: String,
    pub ha_token: String,
    pub snapshot_paths: Vec<PathBuf>,
    pub entry_store_path: PathBuf,
    pub scan_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let config = Self {
            ha_url: env::var("HA_URL").unwrap_or_default(),
            ha_token: env::var("HA_TOKEN").unwrap_or_default(),
            snapshot_paths: parse_path_list(env::var("ST_SNAPSHOT_PATHS").ok()),
            entry_store_path: env::var("ENTRY_STORE_PATH")
                .ok()
                .filter(|path| !path.is_empty())
                .unwrap_or_else(|| DEFAULT_ENTRY_STORE_PATH.to_string())
                .into(),
            scan_interval: parse_interval_safe(env::var("SCAN_INTERVAL_SECS").ok()),
        };

        tracing::info!(
            ha_url = if config.ha_url.is_empty() { "none" } else { config.ha_url.as_str() },
            snapshot_sources = config.snapshot_paths.len(),
            entry_store = %config.entry_store_path.display(),
            scan_interval_secs = config.scan_interval.as_secs(),
            "loaded configuration"
        );
        config
    }
}

/// Splits a comma separated list of paths, skipping empty items
fn parse_path_list(val: Option<String>) -> Vec<PathBuf> {
    val.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Parses a polling period in seconds, falling back to the default scan interval
fn parse_interval_safe(val: Option<String>) -> Duration {
    val.and_then(|secs| secs.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(SCAN_INTERVAL)
}
