//! Configuration loading for Vinadock.
//! Reads vinadock.toml from the current directory or the path in VINADOCK_CONFIG.
//! Every field has a default, so the server also starts without a config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, VinadockError};

pub const CONFIG_ENV: &str = "VINADOCK_CONFIG";
pub const VINA_PATH_ENV: &str = "VINADOCK_VINA_PATH";
pub const BIND_ENV: &str = "VINADOCK_BIND";
pub const DEFAULT_CONFIG_FILE: &str = "vinadock.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub docking: DockingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind()             -> String { "127.0.0.1:8501".to_string() }
fn default_max_upload_bytes() -> usize  { 50 * 1024 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// How the Vina exit status feeds into the success decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// A non-zero exit is a failure even when both output files exist.
    #[default]
    Strict,
    /// Only the presence of the output files counts; the exit status is ignored.
    Lenient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingSettings {
    #[serde(default = "default_vina_path")]
    pub vina_path: PathBuf,
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default)]
    pub exit_policy: ExitPolicy,
    /// Appended after the docking box arguments, e.g. `["--exhaustiveness", "8"]`.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Finished jobs kept in memory (and on disk) before the oldest are evicted.
    #[serde(default = "default_retain_jobs")]
    pub retain_jobs: usize,
}

#[cfg(windows)]
fn default_vina_path() -> PathBuf {
    PathBuf::from(r"C:\Program Files (x86)\The Scripps Research Institute\Vina\vina.exe")
}
#[cfg(not(windows))]
fn default_vina_path() -> PathBuf { PathBuf::from("/usr/local/bin/vina") }

fn default_work_root()           -> PathBuf { PathBuf::from("./vinadock-jobs") }
fn default_timeout_secs()        -> u64     { 3600 }
fn default_max_concurrent_jobs() -> usize   { 1 }
fn default_retain_jobs()         -> usize   { 64 }

impl Default for DockingSettings {
    fn default() -> Self {
        Self {
            vina_path: default_vina_path(),
            work_root: default_work_root(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            exit_policy: ExitPolicy::default(),
            extra_args: Vec::new(),
            retain_jobs: default_retain_jobs(),
        }
    }
}

impl DockingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}


impl Config {
    /// Load configuration from vinadock.toml.
    /// Checks VINADOCK_CONFIG first, then the current directory. An explicitly
    /// named file must exist; the implicit one may be absent.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_ENV).ok();
        let path = explicit
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&path).exists() {
            info!("Loading configuration from {}", path);
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(VinadockError::Config(format!(
                "Config file not found: {} (set by {})",
                path, CONFIG_ENV
            )));
        } else {
            debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Config::default()
        };

        config.apply_overrides(
            std::env::var(VINA_PATH_ENV).ok(),
            std::env::var(BIND_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Environment values win over the file. Empty strings are ignored.
    pub fn apply_overrides(&mut self, vina_path: Option<String>, bind: Option<String>) {
        if let Some(p) = vina_path.filter(|p| !p.trim().is_empty()) {
            self.docking.vina_path = PathBuf::from(p);
        }
        if let Some(b) = bind.filter(|b| !b.trim().is_empty()) {
            self.server.bind = b;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.docking.max_concurrent_jobs == 0 {
            return Err(VinadockError::Config(
                "docking.max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.docking.timeout_secs == 0 {
            return Err(VinadockError::Config(
                "docking.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.docking.retain_jobs == 0 {
            return Err(VinadockError::Config(
                "docking.retain_jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
