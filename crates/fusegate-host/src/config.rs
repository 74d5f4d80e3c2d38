// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Gateway configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML or JSON file (format from the extension), then `FUSEGATE_*`
//! environment variables. Command-line flags are applied last by the
//! binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fusegate_client::DEFAULT_AUTH_SCHEME;
use fusegate_proto::WireEncoding;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manager::ManagerSettings;
use crate::mount_table::MountTable;

pub const ENV_PREFIX: &str = "FUSEGATE";
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1:9876";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Admin API listen address
    pub bind_host: String,

    /// Mount table location; without it mounts are not persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_to: Option<PathBuf>,

    /// Previous mount table, rewritten before every save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_to: Option<PathBuf>,

    pub encoding: WireEncoding,

    /// Per-call deadline in milliseconds; 0 disables it
    pub request_timeout_ms: u64,

    /// How long closing a session waits for in-flight calls; 0 waits indefinitely
    pub drain_timeout_ms: u64,

    pub auth_scheme: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            save_to: None,
            backup_to: None,
            encoding: WireEncoding::default(),
            request_timeout_ms: 0,
            drain_timeout_ms: 0,
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load from `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`GatewayConfig::load`], reading variables from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(env);
        let built = builder.add_source(environment).build()?;

        let config: GatewayConfig = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_host.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_host must not be empty".into()));
        }
        if self.auth_scheme.trim().is_empty() || self.auth_scheme.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "auth_scheme must be a single token, got {:?}",
                self.auth_scheme
            )));
        }
        if self.backup_to.is_some() && self.save_to.is_none() {
            return Err(ConfigError::Invalid("backup_to requires save_to".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn drain_timeout(&self) -> Option<Duration> {
        (self.drain_timeout_ms > 0).then(|| Duration::from_millis(self.drain_timeout_ms))
    }

    /// The backup defaults to the save path with `.bak` appended.
    pub fn mount_table(&self) -> Option<MountTable> {
        let save_to = self.save_to.as_ref()?;
        let backup_to = self.backup_to.clone().unwrap_or_else(|| {
            let mut backup = save_to.clone().into_os_string();
            backup.push(".bak");
            PathBuf::from(backup)
        });
        Some(MountTable::new(save_to.clone(), backup_to))
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            encoding: self.encoding,
            request_timeout: self.request_timeout(),
            drain_timeout: self.drain_timeout(),
        }
    }
}
