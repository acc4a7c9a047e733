// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::horizon::{DEFAULT_MONTH_DAYS, MAX_MONTH_DAYS};
use crate::task_list::PreferenceScope;

/// Client configuration, read from an optional TOML file.
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the remote to-do API
    pub server_url: String,

    /// Where the local preferences are kept
    pub database_url: String,

    /// Length of the "month" horizon
    pub month_days: u64,

    pub preference_scope: PreferenceScope,

    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            database_url: "sqlite://database/preferences.db".to_string(),
            month_days: DEFAULT_MONTH_DAYS,
            preference_scope: PreferenceScope::default(),
            request_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Loads the file if one is given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                let config = Self::from_toml(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.month_days > MAX_MONTH_DAYS {
            bail!(
                "month_days must be at most {}, got {}",
                MAX_MONTH_DAYS,
                self.month_days
            );
        }
        Ok(())
    }

    /// Replaces the URLs given on the command line (or through their env vars).
    pub fn with_overrides(mut self, server_url: Option<String>, database_url: Option<String>) -> Self {
        if let Some(url) = server_url {
            debug!("server_url overridden with {}", url);
            self.server_url = url;
        }
        if let Some(url) = database_url {
            debug!("database_url overridden with {}", url);
            self.database_url = url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
