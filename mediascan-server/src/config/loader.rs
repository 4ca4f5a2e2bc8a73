use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use super::{
    Config, ConfigMetadata, DatabaseConfig,
    sources::{EnvConfig, FileConfig},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("mediascan.toml"),
        PathBuf::from("config/mediascan.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

/// A loaded configuration plus non-fatal findings worth logging once the
/// subscriber is up.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: Vec<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Read `.env`, the config file, and the environment, in that order of
    /// increasing precedence.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Same as [`load`](Self::load) with an explicit environment snapshot and
    /// no `.env` handling.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        Ok(compose(file_config.unwrap_or_default(), env, config_path))
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => path.clone(),
                None => return Ok((None, None)),
            },
        };

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|err| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source: err,
    })
}

fn compose(file: FileConfig, env: EnvConfig, config_path: Option<PathBuf>) -> ConfigLoad {
    let mut warnings = Vec::new();

    let mut scanner = file.scanner.unwrap_or_default();
    if let Some(limit) = env.max_concurrent_operations {
        scanner.max_concurrent_operations = limit;
    }
    if let Some(follow) = env.follow_symlinks {
        scanner.follow_symlinks = follow;
    }

    if scanner.max_concurrent_operations == 0 {
        warnings.push(
            "scanner.max_concurrent_operations is 0; walks will run one operation at a time"
                .to_string(),
        );
    }
    if scanner.event_channel_capacity == 0 {
        warnings.push(
            "scanner.event_channel_capacity is 0; using a single-slot discovery channel"
                .to_string(),
        );
    }

    let config = Config {
        database: DatabaseConfig {
            url: env.database_url.or(file.database.url),
        },
        scanner,
        log_filter: env.log_filter.or(file.log_filter),
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    };

    ConfigLoad { config, warnings }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to load .env file")]
    EnvFile(#[from] dotenvy::Error),
    #[error("DATABASE_URL (or [database] url) must be provided")]
    MissingDatabaseUrl,
    #[error("invalid database URL '{url}'")]
    InvalidDatabaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported database URL '{url}': {reason}")]
    UnsupportedDatabaseUrl { url: String, reason: &'static str },
}
