use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};

use crate::db::Options;
use crate::error::Result;
use crate::ri::BACKEND_NAME;

/// Environment variables prefixed with this override file values;
/// `__` separates nested keys (`RILDB_STORE__CHECKPOINT_BYTES`).
pub const ENV_PREFIX: &str = "RILDB_";

/// Startup configuration of the reverse index.
///
/// ```toml
/// spool = "/var/spool/news"
/// backend = "rildb"
///
/// [store]
/// sync_policy = { every_n_writes = 32 }
/// checkpoint_bytes = 8388608
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory; each store gets its own directory beneath it.
    pub spool: PathBuf,
    /// Registry name of the backend to load.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Tuning shared by the stores of the backend.
    #[serde(default)]
    pub store: Options,
}

fn default_backend() -> String {
    BACKEND_NAME.to_string()
}

impl Config {
    /// Configuration for `spool` with every other setting at its default.
    pub fn from_spool(spool: impl Into<PathBuf>) -> Self {
        Config {
            spool: spool.into(),
            backend: default_backend(),
            store: Options::default(),
        }
    }

    /// The providers `load` extracts from: the TOML file (if any), then the
    /// environment.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(path).extract()?;
        tracing::debug!(
            spool = %config.spool.display(),
            backend = %config.backend,
            "Loaded reverse index configuration"
        );
        Ok(config)
    }

    /// Options for each store opened by the backend.
    pub fn store_options(&self) -> Options {
        self.store
    }
}
