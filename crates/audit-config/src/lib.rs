//! # Audit Configuration
//!
//! YAML inventory parser for fleet-audit.
//!
//! An inventory lists the devices to audit (`assets`), the diagnostic commands
//! to run per device type (`commands`) and optional run `settings`. Credentials
//! may reference environment variables as `${VAR}` or `${VAR:-default}`.

#![warn(missing_docs)]

use device_session::{HostKeyChecking, SessionTarget, SshConfig, DEFAULT_PORT};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod parser;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read inventory file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid inventory: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Substitution pattern failed to compile
    #[error("Invalid substitution pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root inventory structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// Run settings
    #[serde(default, skip_serializing_if = "Settings::is_default")]
    pub settings: Settings,

    /// Devices to audit
    pub assets: Vec<Asset>,

    /// Ordered command lists keyed by device type
    #[serde(default)]
    pub commands: HashMap<String, Vec<String>>,
}

impl Inventory {
    /// Commands configured for a device type, in execution order
    ///
    /// Blank entries are skipped. Returns `None` if the type has no list at all.
    pub fn commands_for(&self, device_type: &str) -> Option<Vec<String>> {
        self.commands.get(device_type).map(|list| {
            list.iter()
                .filter(|cmd| !cmd.trim().is_empty())
                .cloned()
                .collect()
        })
    }
}

/// What to do with already collected output when a command fails mid-sequence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandErrorPolicy {
    /// Stop sending commands and write a report from what was collected
    #[default]
    Partial,
    /// Stop sending commands and write nothing for the device
    Discard,
}

/// Host key policy for the ssh client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Refuse unknown hosts
    Yes,
    /// Trust on first use
    #[default]
    AcceptNew,
    /// Accept any key
    No,
}

impl From<HostKeyPolicy> for HostKeyChecking {
    fn from(policy: HostKeyPolicy) -> Self {
        match policy {
            HostKeyPolicy::Yes => HostKeyChecking::Yes,
            HostKeyPolicy::AcceptNew => HostKeyChecking::AcceptNew,
            HostKeyPolicy::No => HostKeyChecking::No,
        }
    }
}

/// Run settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Report output directory (default `LOG-HTML`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// HTML template path; the built-in template is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,

    /// Upper bound on devices audited at once; unbounded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    /// ssh connect timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    /// Longest wait for a command's output in seconds; waits forever when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout: Option<u64>,

    /// Behaviour on a mid-sequence command failure
    #[serde(default)]
    pub on_command_error: CommandErrorPolicy,

    /// Host key policy
    #[serde(default)]
    pub host_key_checking: HostKeyPolicy,

    /// Private key for devices without a password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
}

impl Settings {
    /// Check if settings are default
    fn is_default(&self) -> bool {
        self == &Settings::default()
    }

    /// ssh client configuration derived from these settings
    pub fn ssh_config(&self) -> SshConfig {
        let mut config = SshConfig::new().with_host_key_checking(self.host_key_checking.into());
        if let Some(secs) = self.connect_timeout {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.command_timeout {
            config = config.with_read_timeout(Duration::from_secs(secs));
        }
        if let Some(key) = &self.identity_file {
            config = config.with_identity_file(key);
        }
        config
    }
}

/// One device to audit
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    /// Device type; selects the command list and the CLI profile
    pub device_type: String,

    /// Device address
    #[serde(rename = "IP", alias = "ip", alias = "host", deserialize_with = "scalar_string")]
    pub host: String,

    /// Login name
    #[serde(default, deserialize_with = "scalar_string")]
    pub username: String,

    /// Login password
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: String,

    /// SSH port (default 22)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Privileged-mode secret
    #[serde(default, deserialize_with = "scalar_string")]
    pub secret: String,
}

impl Asset {
    /// Effective SSH port
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Session target for this device
    pub fn session_target(&self) -> SessionTarget {
        SessionTarget::new(&self.host, &self.device_type)
            .with_port(self.port())
            .with_username(&self.username)
            .with_password(&self.password)
            .with_secret(&self.secret)
    }
}

impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("device_type", &self.device_type)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("port", &self.port())
            .finish_non_exhaustive()
    }
}

/// Accept strings, numbers, booleans or null where a string is expected.
/// Passwords such as `123456` are otherwise parsed as integers by YAML.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!("expected a scalar, found {:?}", other))),
    }
}
