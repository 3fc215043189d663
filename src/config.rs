//! Configuration module for the probing façade

use crate::error::{ConfigError, ValidationError};
use crate::types::{PacketSize, TimeToLive, Timeout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".netprobe.toml";

/// Defaults applied by [`crate::ProbeService::ping_host`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingDefaults {
    /// Timeout in seconds
    pub timeout: f64,

    /// Payload size in bytes
    pub packet_size: u32,

    /// Hop limit, left to the OS when unset
    pub ttl: Option<u32>,
}

impl Default for PingDefaults {
    fn default() -> Self {
        Self {
            timeout: 4.0,
            packet_size: 56,
            ttl: None,
        }
    }
}

/// Defaults applied by [`crate::ProbeService::scan_host_common_ports`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDefaults {
    /// Per-port connect timeout in seconds
    pub timeout: f64,

    /// Connect attempts in flight at once
    pub max_concurrent: usize,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            timeout: 1.0,
            max_concurrent: 100,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub ping: PingDefaults,
    pub scan: ScanDefaults,
}

impl ProbeConfig {
    pub fn with_ping_timeout(mut self, seconds: f64) -> Self {
        self.ping.timeout = seconds;
        self
    }

    pub fn with_packet_size(mut self, bytes: u32) -> Self {
        self.ping.packet_size = bytes;
        self
    }

    pub fn with_ttl(mut self, ttl: Option<u32>) -> Self {
        self.ping.ttl = ttl;
        self
    }

    pub fn with_scan_timeout(mut self, seconds: f64) -> Self {
        self.scan.timeout = seconds;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.scan.max_concurrent = max_concurrent;
        self
    }

    pub fn ping_timeout(&self) -> Result<Timeout, ValidationError> {
        Timeout::new(self.ping.timeout)
    }

    pub fn packet_size(&self) -> Result<PacketSize, ValidationError> {
        PacketSize::new(self.ping.packet_size)
    }

    pub fn ttl(&self) -> Result<Option<TimeToLive>, ValidationError> {
        self.ping.ttl.map(TimeToLive::new).transpose()
    }

    pub fn scan_timeout(&self) -> Result<Timeout, ValidationError> {
        Timeout::new(self.scan.timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ping_timeout()?;
        self.packet_size()?;
        self.ttl()?;
        self.scan_timeout()?;
        if self.scan.max_concurrent == 0 {
            return Err(ValidationError::BadConcurrency(0));
        }
        Ok(())
    }

    /// Load and validate configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ProbeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the per-user config file, `~/.netprobe.toml`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Load configuration from the default location, falling back to
    /// built-in defaults when the file is missing or invalid
    pub fn load_default_config() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::from_toml_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
