//! Connection target definitions

use std::fmt;

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Everything needed to open a privileged session on one device
///
/// Credentials are never printed: the `Debug` impl masks the password and the
/// enable secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionTarget {
    host: String,
    port: u16,
    username: String,
    password: String,
    secret: String,
    device_type: String,
}

impl SessionTarget {
    /// Create a target for the given host and device type
    pub fn new(host: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            secret: String::new(),
            device_type: device_type.into(),
        }
    }

    /// Set the login name
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the login password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the SSH port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the privileged-mode secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Device address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// SSH port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Login name, possibly empty
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password, possibly empty
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Privileged-mode secret, possibly empty
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Device type used to select the interaction profile
    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    /// `user@host`, or just the host when no username is set
    pub fn login(&self) -> String {
        if self.username.is_empty() {
            self.host.clone()
        } else {
            format!("{}@{}", self.username, self.host)
        }
    }
}

impl fmt::Debug for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("device_type", &self.device_type)
            .finish()
    }
}
