//! # Configuration
//!
//! `phylograph.toml` plus environment overrides.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, environment
//! variables, CLI flags (applied by the caller).
//!
//! ```toml
//! snapshot_path = "phylograph.snapshot.ttl"
//! seed_demo = true
//!
//! [federation]
//! timeout_secs = 30
//! default_endpoint = "https://sparql.example.org/query"
//! ```

use phylograph_core::PhyloError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "phylograph.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PHYLOGRAPH_CONFIG";

/// Environment override for `snapshot_path`.
pub const SNAPSHOT_ENV: &str = "PHYLOGRAPH_SNAPSHOT";

/// Environment override for `federation.timeout_secs`.
pub const TIMEOUT_ENV: &str = "PHYLOGRAPH_FEDERATION_TIMEOUT_SECS";

const DEFAULT_SNAPSHOT_PATH: &str = "phylograph.snapshot.ttl";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Snapshot file read on startup and written on shutdown.
    pub snapshot_path: PathBuf,
    /// Seed the demo facts when no snapshot exists.
    pub seed_demo: bool,
    pub federation: FederationConfig,
}

/// `[federation]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FederationConfig {
    pub timeout_secs: u64,
    pub default_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            seed_demo: true,
            federation: FederationConfig::default(),
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_endpoint: None,
        }
    }
}

impl FederationConfig {
    /// Request timeout for federated queries.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, PhyloError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| PhyloError::ConfigError(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the process environment.
    ///
    /// An explicit path (or `PHYLOGRAPH_CONFIG`) must exist; the default
    /// `phylograph.toml` is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PhyloError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match named {
            Some(path) => Self::read(&path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::read(default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, PhyloError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PhyloError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_toml(&text)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), PhyloError> {
        if let Some(path) = lookup(SNAPSHOT_ENV).filter(|p| !p.trim().is_empty()) {
            self.snapshot_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            self.federation.timeout_secs = secs.trim().parse().map_err(|_| {
                PhyloError::ConfigError(format!("{} must be a whole number of seconds", TIMEOUT_ENV))
            })?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), PhyloError> {
        if self.federation.timeout_secs == 0 {
            return Err(PhyloError::ConfigError(
                "federation.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
