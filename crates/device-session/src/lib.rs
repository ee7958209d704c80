//! Interactive command-line sessions to network devices
//!
//! This crate wraps the system ssh client behind a small [`Connector`] /
//! [`Session`] seam: connect, enter privileged mode, send commands and read back
//! their output, close. Callers that need a different transport, or a scripted
//! device for tests, implement the two traits themselves.

#![warn(missing_docs)]

pub mod backends;
pub mod command;
pub mod connector;
pub mod error;
pub mod profile;
pub mod screen;
pub mod target;

pub use backends::{HostKeyChecking, SshConfig, SshConnector, SshSession};
pub use command::Command;
pub use connector::{Connector, Session};
pub use error::{Error, Result};
pub use profile::DeviceProfile;
pub use target::{SessionTarget, DEFAULT_PORT};
