use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{fs::File, io::Read};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unsupported listen address scheme in '{address}'")]
    UnsupportedScheme { address: String },
    #[error("Invalid listen address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        use crate::errors::codes::ErrorCode;

        match self {
            ConfigError::Io(_) => ErrorCode::CONFIG_READ_FAILED,
            ConfigError::Yaml(_) => ErrorCode::CONFIG_PARSE_FAILED,
            ConfigError::UnsupportedScheme { .. } | ConfigError::InvalidAddress { .. } => {
                ErrorCode::CONFIG_BAD_LISTEN_ADDRESS
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// `unix://<path>`, `tcp://<host>:<port>` or `fd://<index>`.
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: "unix:///run/nerdshim.sock".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub engine_binary: String,
    pub build_binary: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            engine_binary: "nerdctl".to_string(),
            build_binary: "buildctl".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub service_name: String,
    pub log_level: String,
    pub excluded_modules: Vec<String>,
    pub otlp_endpoint: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            enabled: false,
            service_name: "nerdshim".to_string(),
            log_level: "info".to_string(),
            excluded_modules: Vec::new(),
            otlp_endpoint: "http://127.0.0.1:4317".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file: File = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

/// Where the HTTP server binds. Exactly one mode is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddress {
    Unix(PathBuf),
    Tcp(String),
    /// Index into the listener set inherited from the supervisor
    /// (socket activation), starting at 0.
    Fd(usize),
}

impl FromStr for ListenAddress {
    type Err = ConfigError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        if let Some(path) = address.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(ConfigError::InvalidAddress {
                    address: address.to_string(),
                    reason: "empty socket path".to_string(),
                });
            }
            return Ok(ListenAddress::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = address.strip_prefix("tcp://") {
            if !addr.contains(':') {
                return Err(ConfigError::InvalidAddress {
                    address: address.to_string(),
                    reason: "expected host:port".to_string(),
                });
            }
            return Ok(ListenAddress::Tcp(addr.to_string()));
        }
        if let Some(index) = address.strip_prefix("fd://") {
            let index = index.parse().map_err(|_| ConfigError::InvalidAddress {
                address: address.to_string(),
                reason: "expected a listener index".to_string(),
            })?;
            return Ok(ListenAddress::Fd(index));
        }
        Err(ConfigError::UnsupportedScheme {
            address: address.to_string(),
        })
    }
}
