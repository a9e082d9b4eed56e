//! # Dashboard Configuration
//!
//! Settings are read from an optional YAML file and then overridden by
//! environment variables.
//!
//! ## YAML Format
//!
//! ```yaml
//! api_base_url: "http://localhost:5000/api"
//! request_timeout_secs: 30
//! token_file: "/home/me/.local/share/budget-dashboard/session_token"
//! log_filter: "info,budget_dashboard=debug"
//! ```
//!
//! ## Environment Overrides
//!
//! - `BUDGET_DASHBOARD_CONFIG` - path of the YAML file
//! - `BUDGET_DASHBOARD_API_URL`
//! - `BUDGET_DASHBOARD_TIMEOUT_SECS`
//! - `BUDGET_DASHBOARD_TOKEN_FILE`
//! - `BUDGET_DASHBOARD_LOG`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_PATH_ENV: &str = "BUDGET_DASHBOARD_CONFIG";
pub const API_URL_ENV: &str = "BUDGET_DASHBOARD_API_URL";
pub const TIMEOUT_ENV: &str = "BUDGET_DASHBOARD_TIMEOUT_SECS";
pub const TOKEN_FILE_ENV: &str = "BUDGET_DASHBOARD_TOKEN_FILE";
pub const LOG_ENV: &str = "BUDGET_DASHBOARD_LOG";

const APP_DIR: &str = "budget-dashboard";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the remote service, without trailing slash
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Where the session token is persisted; platform data dir when unset
    pub token_file: Option<PathBuf>,
    /// `tracing-subscriber` filter directive
    pub log_filter: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 30,
            token_file: None,
            log_filter: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load from the config file (if any) and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&yaml)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded dashboard config from {:?}", path);
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply overrides from a variable lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV) {
            self.api_base_url = url;
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got {:?}", TIMEOUT_ENV, secs))?;
        }
        if let Some(path) = lookup(TOKEN_FILE_ENV) {
            self.token_file = Some(PathBuf::from(path));
        }
        if let Some(filter) = lookup(LOG_ENV) {
            self.log_filter = filter;
        }
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Token file location, falling back to the platform data directory
    pub fn token_path(&self) -> PathBuf {
        self.token_file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("session_token")
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.yaml"))
}
