//! Error types for the audit pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can end or cut short a device audit
///
/// None of these escape a device task: they are logged with host context and
/// reported through [`TaskOutcome`](crate::task::TaskOutcome).
#[derive(Error, Debug)]
pub enum AuditError {
    /// Connecting, logging in or entering privileged mode failed
    #[error("connection failed for {host}: {source}")]
    Connection {
        /// Device address
        host: String,
        /// Session error
        #[source]
        source: device_session::Error,
    },

    /// A command failed mid-sequence
    #[error("command '{command}' failed on {host}: {source}")]
    Command {
        /// Device address
        host: String,
        /// The command that failed
        command: String,
        /// Session error
        #[source]
        source: device_session::Error,
    },

    /// Writing the report file failed
    #[error("failed to write report for {host} to {}: {source}", .path.display())]
    Render {
        /// Device address
        host: String,
        /// Report file path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// The inventory has no command list for the device's type
    #[error("no command list for device type '{device_type}' (host {host})")]
    MissingCommands {
        /// Device address
        host: String,
        /// The unmatched device type
        device_type: String,
    },

    /// The report directory could not be created
    #[error("failed to create report directory {}: {source}", .path.display())]
    ReportDir {
        /// Directory path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },
}

impl AuditError {
    /// The device this error belongs to, if any
    pub fn host(&self) -> Option<&str> {
        match self {
            AuditError::Connection { host, .. }
            | AuditError::Command { host, .. }
            | AuditError::Render { host, .. }
            | AuditError::MissingCommands { host, .. } => Some(host),
            AuditError::ReportDir { .. } => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AuditError>;
