// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Device identity presented during the sync handshake.
//!
//! A device is identified by a stable `device_id` plus descriptive
//! [`DeviceInfo`]. When no id is configured one is derived from the local
//! user, platform and the current time, then persisted so later runs reuse it.

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::clock::ClockSource;
use crate::error::{Error, Result};

/// Kind of device taking part in sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Desktop,
    Mobile,
    Tablet,
    Browser,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Desktop => "desktop",
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Browser => "browser",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "desktop" => Ok(DeviceType::Desktop),
            "mobile" => Ok(DeviceType::Mobile),
            "tablet" => Ok(DeviceType::Tablet),
            "browser" => Ok(DeviceType::Browser),
            _ => Err(Error::InvalidDeviceType(s.to_string())),
        }
    }
}

/// Operating platform of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Macos,
    Linux,
    Android,
    Ios,
    Browser,
}

impl Platform {
    /// Detects the platform this binary was built for.
    ///
    /// Unrecognized targets (BSDs, etc.) report as [`Platform::Linux`].
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::Macos,
            "android" => Platform::Android,
            "ios" => Platform::Ios,
            _ => Platform::Linux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Macos => "macos",
            Platform::Linux => "linux",
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Browser => "browser",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::Macos => "macOS",
            Platform::Linux => "Linux",
            Platform::Android => "Android",
            Platform::Ios => "iOS",
            Platform::Browser => "Web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::Macos),
            "linux" => Ok(Platform::Linux),
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "browser" => Ok(Platform::Browser),
            _ => Err(Error::InvalidPlatform(s.to_string())),
        }
    }
}

/// Descriptive device details sent as `deviceInfo` in the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_name: String,
    pub device_type: DeviceType,
    pub platform: Platform,
}

impl DeviceInfo {
    pub fn new(device_name: impl Into<String>, device_type: DeviceType, platform: Platform) -> Self {
        DeviceInfo { device_name: device_name.into(), device_type, platform }
    }

    /// Info for the local machine, named e.g. "Linux Desktop".
    pub fn local(device_type: DeviceType) -> Self {
        let platform = Platform::current();
        DeviceInfo::new(default_device_name(platform, device_type), device_type, platform)
    }
}

/// The identity a connection authenticates as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub device_id: String,
    pub device_info: DeviceInfo,
}

impl DeviceIdentity {
    /// Creates an identity, validating the device id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeviceId`] if the id is empty or contains whitespace.
    pub fn new(device_id: impl Into<String>, device_info: DeviceInfo) -> Result<Self> {
        let device_id = device_id.into();
        if !is_valid_device_id(&device_id) {
            return Err(Error::InvalidDeviceId(device_id));
        }
        Ok(DeviceIdentity { device_id, device_info })
    }

    pub fn device_name(&self) -> &str {
        &self.device_info.device_name
    }
}

/// Returns true if `id` can be used as a device id.
pub fn is_valid_device_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}

/// Default human-readable device name, e.g. "macOS Desktop".
pub fn default_device_name(platform: Platform, device_type: DeviceType) -> String {
    let kind = match device_type {
        DeviceType::Desktop => "Desktop",
        DeviceType::Mobile => "Phone",
        DeviceType::Tablet => "Tablet",
        DeviceType::Browser => "Browser",
    };
    format!("{} {}", platform.display_name(), kind)
}

/// Derives a fresh device id: `{device_type}_{12 hex chars}`.
///
/// The hex part is a SHA-256 prefix over user, platform and time, so two
/// devices of the same user get different ids.
pub fn generate_device_id(
    device_type: DeviceType,
    platform: Platform,
    user: &str,
    now_ms: u64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    hasher.update(b":");
    hasher.update(platform.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(now_ms.to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}_{}", device_type, &digest[..12])
}

/// Reads the device id persisted at `path`, creating and persisting a new one
/// if the file is missing or holds an invalid id.
pub fn load_or_create_device_id(
    path: &Path,
    device_type: DeviceType,
    clock: &impl ClockSource,
) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let id = content.trim();
            if is_valid_device_id(id) {
                return Ok(id.to_string());
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let id = generate_device_id(device_type, Platform::current(), &get_user_name(), clock.now_ms());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{id}\n"))?;
    Ok(id)
}

/// Returns the current user's name for device-id derivation.
///
/// Resolution order:
/// 1. Unix username from USER or LOGNAME env var (if not system account)
/// 2. Fallback to "user"
pub fn get_user_name() -> String {
    if let Some(name) = get_unix_username() {
        if !is_system_account(&name) {
            return name;
        }
    }

    "user".to_string()
}

fn get_unix_username() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|s| !s.is_empty())
}

fn is_system_account(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "root" | "system" | "administrator" | "admin" | "daemon" | "nobody"
    )
}
