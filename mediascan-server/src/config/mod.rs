pub mod loader;
pub mod sources;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};

use std::path::PathBuf;

use url::Url;

use mediascan_core::config::ScannerConfig;

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scanner: ScannerConfig,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

impl Config {
    /// Filter applied to the log subscriber when `RUST_LOG` is not set.
    pub const DEFAULT_LOG_FILTER: &'static str = "info";

    pub fn log_filter(&self) -> &str {
        self.log_filter
            .as_deref()
            .unwrap_or(Self::DEFAULT_LOG_FILTER)
    }

    /// PostgreSQL connection URL, required unless running ephemeral.
    pub fn database_url(&self) -> Result<&str, ConfigLoadError> {
        let url = self
            .database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigLoadError::MissingDatabaseUrl)?;

        let parsed = Url::parse(url).map_err(|source| ConfigLoadError::InvalidDatabaseUrl {
            url: url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(ConfigLoadError::UnsupportedDatabaseUrl {
                url: url.to_string(),
                reason: "scheme must be postgres or postgresql",
            });
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(ConfigLoadError::UnsupportedDatabaseUrl {
                url: url.to_string(),
                reason: "no database host given",
            });
        }
        Ok(url)
    }
}
