use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use mediascan_core::config::ScannerConfig;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub database: FileDatabaseConfig,
    pub scanner: Option<ScannerConfig>,
    pub log_filter: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Values taken from the process environment. Each one overrides the
/// matching file setting.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub max_concurrent_operations: Option<usize>,
    pub follow_symlinks: Option<bool>,
    pub log_filter: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: std::env::var("MEDIASCAN_CONFIG").ok().map(PathBuf::from),
            database_url: std::env::var("DATABASE_URL").ok(),
            max_concurrent_operations: std::env::var("MEDIASCAN_MAX_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok()),
            follow_symlinks: std::env::var("MEDIASCAN_FOLLOW_SYMLINKS")
                .ok()
                .and_then(|s| parse_bool(&s)),
            log_filter: std::env::var("MEDIASCAN_LOG").ok(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
