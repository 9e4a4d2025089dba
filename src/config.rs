//! Application configuration
//!
//! Settings come from a TOML file, with the connection string overridable
//! from the environment so secrets need not live on disk:
//!
//! ```toml
//! connection_string = "AuthType=OAuth;Url=https://contoso.crm.dynamics.com;AccessToken=..."
//! output_folder = "/var/exports"
//! ```

use crate::connection::ConnectionString;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `connection_string`
pub const CONNECTION_STRING_ENV: &str = "EXPORT_SOLUTION_CONNECTION_STRING";

/// Configuration file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "export-solution.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// CRM connection string (see [`ConnectionString`])
    #[serde(default)]
    pub connection_string: Option<String>,

    /// Folder shown in log labels; the export target comes from the command line
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load configuration from `path`, then apply the environment override
    ///
    /// A missing file is accepted when the environment supplies the
    /// connection string.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let env_override = std::env::var(CONNECTION_STRING_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self::load_with_override(path.as_ref(), env_override)
    }

    fn load_with_override(path: &Path, env_override: Option<String>) -> Result<Self> {
        let mut config = if path.exists() || env_override.is_none() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "config file absent, using environment");
            Self::default()
        };

        if let Some(value) = env_override {
            tracing::debug!("connection string taken from {}", CONNECTION_STRING_ENV);
            config.connection_string = Some(value);
        }
        Ok(config)
    }

    /// Parsed connection string
    pub fn connection(&self) -> Result<ConnectionString> {
        let raw = self.connection_string.as_deref().with_context(|| {
            format!(
                "No CRM connection string configured (set connection_string or {})",
                CONNECTION_STRING_ENV
            )
        })?;
        raw.parse::<ConnectionString>()
            .context("Invalid CRM connection string")
    }
}
