//! Application configuration.
//!
//! Read from a TOML file (`RENTIFY_CONFIG`, or `rentify.toml` in the working
//! directory when present), then overridden by environment variables:
//!
//! - `HOST`, `PORT`: server bind address (default `0.0.0.0:8080`)
//! - `RENTIFY_API_URL`: API root used by the client
//! - `RENTIFY_UTC_OFFSET_MINUTES`: reference timezone for "today" (default 0)
//! - `RENTIFY_MAX_RETRIES`: read retries (default 2)
//! - `RENTIFY_RETRY_DELAY_MS`: first retry delay (default 200)

use crate::client::{ClientOptions, RetryPolicy};
use crate::clock::SystemClock;
use crate::models::Property;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_ENV: &str = "RENTIFY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "rentify.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid bind address {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub calendar: CalendarSettings,
    /// Listings loaded into the repository at startup
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarSettings {
    /// Offset of the reference timezone from UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    200
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// File (if any) plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies overrides looked up through `lookup`, so tests need not touch
    /// the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", port)?;
        }
        if let Some(url) = lookup("RENTIFY_API_URL") {
            self.client.base_url = url;
        }
        if let Some(offset) = lookup("RENTIFY_UTC_OFFSET_MINUTES") {
            self.calendar.utc_offset_minutes = parse_env("RENTIFY_UTC_OFFSET_MINUTES", offset)?;
        }
        if let Some(retries) = lookup("RENTIFY_MAX_RETRIES") {
            self.client.max_retries = parse_env("RENTIFY_MAX_RETRIES", retries)?;
        }
        if let Some(delay) = lookup("RENTIFY_RETRY_DELAY_MS") {
            self.client.retry_delay_ms = parse_env("RENTIFY_RETRY_DELAY_MS", delay)?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    pub fn clock(&self) -> SystemClock {
        SystemClock::from_offset_minutes(self.calendar.utc_offset_minutes)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.client.base_url.clone(),
            timeout: Duration::from_secs(self.client.timeout_secs),
            retry: RetryPolicy::new(
                self.client.max_retries,
                Duration::from_millis(self.client.retry_delay_ms),
            ),
            ..Default::default()
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}
