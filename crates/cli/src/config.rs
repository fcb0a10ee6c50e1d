// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration management.
//!
//! Configuration is stored in `config.toml` and includes:
//! - `endpoint`: WebSocket URL of the sync server
//! - device identity overrides (`device_id`, `device_name`, `device_type`, `platform`)
//! - `[reconnect]` backoff bounds, heartbeat interval and queue capacity
//!
//! Every key is optional; a missing file means all defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ul_core::identity::{default_device_name, is_valid_device_id, load_or_create_device_id};
use ul_core::{ClockSource, DeviceIdentity, DeviceInfo, DeviceType, Platform};

use crate::error::{Error, Result};
use crate::sync::SyncSettings;

const APP_DIR_NAME: &str = "unilink";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEVICE_ID_FILE_NAME: &str = "device_id";

/// Client configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Sync server URL (`ws://` or `wss://`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Fixed device id. When absent one is generated and persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Human-readable name shown on other devices (default: "<Platform> <Type>").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_type: DeviceType,
    /// Platform reported to the server (default: the running OS).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Keepalive period in milliseconds (default: 30000).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Maximum messages held while disconnected (default: 100).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Reconnect backoff bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the first retry in milliseconds (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling for retry delays in milliseconds (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_endpoint() -> String {
    "ws://localhost:5000/ws".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_queue_capacity() -> usize {
    100
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig { base_delay_ms: default_base_delay_ms(), max_delay_ms: default_max_delay_ms() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: default_endpoint(),
            device_id: None,
            device_name: None,
            device_type: DeviceType::default(),
            platform: None,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            queue_capacity: default_queue_capacity(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config at `path`, or defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Config::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Check values that would make the client misbehave.
    pub fn validate(&self) -> Result<()> {
        validate_endpoint(&self.endpoint)?;
        if let Some(id) = &self.device_id {
            if !is_valid_device_id(id) {
                return Err(ul_core::Error::InvalidDeviceId(id.clone()).into());
            }
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::ZeroSetting { field: "heartbeat_interval_ms" });
        }
        if self.queue_capacity == 0 {
            return Err(Error::ZeroSetting { field: "queue_capacity" });
        }
        if self.reconnect.base_delay_ms == 0 {
            return Err(Error::ZeroSetting { field: "reconnect.base_delay_ms" });
        }
        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            return Err(Error::InvalidBackoff {
                base_ms: self.reconnect.base_delay_ms,
                max_ms: self.reconnect.max_delay_ms,
            });
        }
        Ok(())
    }

    /// Render the config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Platform to report, falling back to the running OS.
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    /// Connection tunables derived from this config.
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            reconnect_base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
            reconnect_max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            queue_capacity: self.queue_capacity,
        }
    }

    /// Device info advertised in the handshake.
    pub fn device_info(&self) -> DeviceInfo {
        let platform = self.platform();
        let name = self
            .device_name
            .clone()
            .unwrap_or_else(|| default_device_name(platform, self.device_type));
        DeviceInfo::new(name, self.device_type, platform)
    }

    /// Resolve this device's identity.
    ///
    /// The id comes from `id_override` (the environment), then the config,
    /// then the id persisted in `state_dir`, generating one there if needed.
    pub fn identity(
        &self,
        id_override: Option<String>,
        state_dir: Option<&Path>,
        clock: &impl ClockSource,
    ) -> Result<DeviceIdentity> {
        let device_id = match id_override.or_else(|| self.device_id.clone()) {
            Some(id) => id,
            None => {
                let dir = state_dir.ok_or(Error::NoStateDir)?;
                load_or_create_device_id(&dir.join(DEVICE_ID_FILE_NAME), self.device_type, clock)?
            }
        };
        Ok(DeviceIdentity::new(device_id, self.device_info())?)
    }
}

/// Returns an error unless `endpoint` is a WebSocket URL.
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    let rest = endpoint
        .strip_prefix("ws://")
        .or_else(|| endpoint.strip_prefix("wss://"))
        .ok_or_else(|| Error::InvalidEndpoint(endpoint.to_string()))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(Error::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(())
}

/// Config file location: `explicit`, then `UNILINK_CONFIG`, then the
/// platform config directory.
pub fn config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .or_else(crate::env::config_path)
        .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)))
}

/// Directory for persisted client state (the generated device id):
/// `UNILINK_STATE_DIR`, then the platform state or local data directory.
pub fn state_dir() -> Option<PathBuf> {
    crate::env::state_dir().or_else(|| {
        dirs::state_dir().or_else(dirs::data_local_dir).map(|d| d.join(APP_DIR_NAME))
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
