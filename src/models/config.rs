// Ethernet Bundle - Application Configuration
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Application configuration model.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::CONFIG_DIR_NAME;

/// System-wide configuration file location.
pub const SYSTEM_CONFIG_FILE: &str = "/etc/ethernet-bundle/config.toml";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the record store files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base name of the store files (`<name>.json`, `<name>.backup.json`).
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Interface name prefix; record id N maps to `<prefix>{N-1}`.
    #[serde(default = "default_interface_prefix")]
    pub interface_prefix: String,

    /// DHCP client program started for DHCP-enabled interfaces.
    #[serde(default = "default_dhcp_client")]
    pub dhcp_client: String,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Apply every stored record to the system at startup.
    #[serde(default = "default_true")]
    pub apply_on_start: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/ethernet-bundle")
}

fn default_store_name() -> String {
    "ethernet".to_string()
}

fn default_interface_prefix() -> String {
    "eth".to_string()
}

fn default_dhcp_client() -> String {
    "dhclient".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_name: default_store_name(),
            interface_prefix: default_interface_prefix(),
            dhcp_client: default_dhcp_client(),
            log_level: default_log_level(),
            apply_on_start: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, super::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| super::Error::ConfigReadFailed(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Candidate configuration files, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    /// Load from `explicit` if given, otherwise from the first existing
    /// search path, otherwise fall back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, super::Error> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match Self::search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!("Loading configuration from {:?}", path);
                Self::load_from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }
}
