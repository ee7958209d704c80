//! Session backends
//!
//! Only the ssh client backend ships today. Other transports plug in by
//! implementing [`Connector`](crate::connector::Connector) and
//! [`Session`](crate::connector::Session).

pub mod ssh;
pub use ssh::{HostKeyChecking, SshConfig, SshConnector, SshSession};
