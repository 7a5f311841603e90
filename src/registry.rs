//! Backend name → constructor table.
//!
//! Startup code builds one `Registry`, registers every backend it links in,
//! and hands the table to whatever loads the configured backend. Nothing is
//! registered behind the caller's back.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::method::RiMethod;
use crate::ri;

/// Builds a reverse index backend from the configuration.
pub type RiLoader = fn(&Config) -> Result<Box<dyn RiMethod>>;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    loaders: BTreeMap<String, RiLoader>,
}

impl Registry {
    /// An empty table.
    pub fn new() -> Self {
        Registry::default()
    }

    /// A table holding the backends shipped with this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Registry::new();
        registry.loaders.insert(ri::BACKEND_NAME.to_string(), ri::load as RiLoader);
        registry
    }

    /// Add a backend. Names are unique.
    pub fn register(&mut self, name: &str, loader: RiLoader) -> Result<()> {
        if self.loaders.contains_key(name) {
            return Err(Error::DuplicateBackend(name.to_string()));
        }
        self.loaders.insert(name.to_string(), loader);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<RiLoader> {
        self.loaders.get(name).copied()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// Construct the backend named by `cfg.backend`.
    pub fn load(&self, cfg: &Config) -> Result<Box<dyn RiMethod>> {
        let loader = self
            .get(&cfg.backend)
            .ok_or_else(|| Error::UnknownBackend(cfg.backend.clone()))?;
        tracing::debug!(backend = %cfg.backend, spool = %cfg.spool.display(), "Loading reverse index backend");
        loader(cfg)
    }
}
