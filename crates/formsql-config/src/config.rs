use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{ConfigError, Result},
    utils::{is_valid_savepoint_prefix, resolve_path, xdg_config_home, xdg_data_home},
};

pub const DEFAULT_SELECT_LIMIT: u32 = 1000;
pub const DEFAULT_MUTATION_LIMIT: u32 = 1;
pub const DEFAULT_SAVEPOINT_PREFIX: &str = "s";

/// Settings used when opening a store session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Path to the SQLite store file.
    /// Default: $XDG_DATA_HOME/formsql/store.db
    pub database_path: Option<String>,

    /// Row limit applied to read statements when the caller gives none.
    /// Default: 1000
    pub select_limit: Option<u32>,

    /// Limit recorded on mutating statements when the caller gives none.
    /// Informational only: insert, update and delete never render a LIMIT.
    /// Default: 1
    pub mutation_limit: Option<u32>,

    /// Savepoints are named `<prefix><counter>`.
    /// Default: "s"
    pub savepoint_prefix: Option<String>,

    /// Enforce foreign key constraints on the connection.
    /// Default: true
    pub foreign_keys: Option<bool>,

    /// How long the driver waits on a locked store before failing.
    pub busy_timeout_ms: Option<u64>,
}

/// Location of the configuration file: `$FORMSQL_CONFIG` or
/// `$XDG_CONFIG_HOME/formsql/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var("FORMSQL_CONFIG") {
        Ok(path) => resolve_path(&path),
        Err(_) => xdg_config_home().join("formsql").join("config.toml"),
    }
}

impl StoreConfig {
    pub fn default_config() -> Self {
        Self {
            database_path: Some(
                xdg_data_home()
                    .join("formsql")
                    .join("store.db")
                    .display()
                    .to_string(),
            ),
            select_limit: Some(DEFAULT_SELECT_LIMIT),
            mutation_limit: Some(DEFAULT_MUTATION_LIMIT),
            savepoint_prefix: Some(DEFAULT_SAVEPOINT_PREFIX.to_string()),
            foreign_keys: Some(true),
            busy_timeout_ms: None,
        }
    }

    /// Loads the configuration from [`config_path`], falling back to the
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("loading configuration from {}", path.display());
                toml::from_str(&content)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "No configuration found at {}, using defaults",
                    path.display()
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.resolve()?;
        Ok(config)
    }

    /// Fills unset values with defaults and validates the rest.
    pub fn resolve(&mut self) -> Result<()> {
        if self.select_limit == Some(0) {
            return Err(ConfigError::InvalidLimit("select_limit"));
        }
        if self.mutation_limit == Some(0) {
            return Err(ConfigError::InvalidLimit("mutation_limit"));
        }
        if let Some(prefix) = &self.savepoint_prefix {
            if !is_valid_savepoint_prefix(prefix) {
                return Err(ConfigError::InvalidSavepointPrefix(prefix.clone()));
            }
        }

        self.select_limit.get_or_insert(DEFAULT_SELECT_LIMIT);
        self.mutation_limit.get_or_insert(DEFAULT_MUTATION_LIMIT);
        self.savepoint_prefix
            .get_or_insert_with(|| DEFAULT_SAVEPOINT_PREFIX.to_string());
        self.foreign_keys.get_or_insert(true);

        Ok(())
    }

    pub fn get_database_path(&self) -> PathBuf {
        if let Ok(env_path) = std::env::var("FORMSQL_DB") {
            return resolve_path(&env_path);
        }
        match &self.database_path {
            Some(path) => resolve_path(path),
            None => xdg_data_home().join("formsql").join("store.db"),
        }
    }

    pub fn select_limit(&self) -> u32 {
        self.select_limit.unwrap_or(DEFAULT_SELECT_LIMIT)
    }

    pub fn mutation_limit(&self) -> u32 {
        self.mutation_limit.unwrap_or(DEFAULT_MUTATION_LIMIT)
    }

    pub fn savepoint_prefix(&self) -> &str {
        self.savepoint_prefix
            .as_deref()
            .unwrap_or(DEFAULT_SAVEPOINT_PREFIX)
    }

    pub fn foreign_keys(&self) -> bool {
        self.foreign_keys.unwrap_or(true)
    }

    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout_ms.map(Duration::from_millis)
    }

    /// Writes the configuration to `path`, refusing to overwrite an existing file.
    pub fn write_new<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ConfigError::ConfigAlreadyExists(
                path.display().to_string(),
            ));
        }

        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serialized)?;
        info!("Configuration written to {}", path.display());
        Ok(())
    }
}
