//! Error types for device sessions

use thiserror::Error;

/// Unified error type for device sessions
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch the ssh client process
    #[error("failed to spawn session process: {reason}")]
    SpawnFailed {
        /// The reason for the spawn failure
        reason: String,
    },

    /// The session could not be established
    #[error("connection to {host} failed: {reason}")]
    ConnectionFailed {
        /// The hostname or IP address that failed to connect
        host: String,
        /// The detailed reason for the connection failure
        reason: String,
    },

    /// The device refused the supplied credentials
    #[error("authentication failed for {username}@{host}")]
    AuthenticationFailed {
        /// The device that rejected the login
        host: String,
        /// The login name that was rejected
        username: String,
    },

    /// Entering privileged mode failed
    #[error("privilege escalation failed on {host}: {reason}")]
    PrivilegeEscalationFailed {
        /// The device that refused escalation
        host: String,
        /// What the device answered
        reason: String,
    },

    /// The session ended while a command was in flight
    #[error("session to {host} closed while running '{command}'")]
    SessionClosed {
        /// The device whose session ended
        host: String,
        /// The command being executed
        command: String,
    },

    /// No prompt appeared within the configured read timeout
    #[error("timed out after {seconds}s waiting for prompt from {host}")]
    Timeout {
        /// The device that stopped answering
        host: String,
        /// The configured timeout
        seconds: u64,
    },

    /// A device profile carries a prompt pattern that does not compile
    #[error("invalid prompt pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// The regex compilation error
        #[source]
        source: regex::Error,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            host: host.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
