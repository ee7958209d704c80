//! Connector and session traits for talking to a device CLI

use crate::error::Result;
use crate::target::SessionTarget;
use async_trait::async_trait;
use tracing::debug;

/// An open, interactive CLI session on one device
///
/// Sessions are exclusively owned by whoever opened them. Callers must invoke
/// [`Session::close`] when done; implementations are also expected to tear the
/// transport down when dropped.
#[async_trait]
pub trait Session: Send {
    /// The device this session is attached to
    fn host(&self) -> &str;

    /// Enter privileged mode, answering a password prompt with `secret`
    async fn enable(&mut self, secret: &str) -> Result<()>;

    /// Send one command and return its output without echo or trailing prompt
    async fn send_command(&mut self, command: &str) -> Result<String>;

    /// Leave the device and release the transport
    async fn close(&mut self) -> Result<()>;
}

/// Something that can open sessions to devices
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The session type this connector produces
    type Session: Session + 'static;

    /// Connect and log in, leaving the session at the device's first prompt
    async fn connect(&self, target: &SessionTarget) -> Result<Self::Session>;

    /// Connect and enter privileged mode
    ///
    /// If escalation fails the half-open session is closed before the error is
    /// returned, so callers only ever hold fully usable sessions.
    async fn open(&self, target: &SessionTarget) -> Result<Self::Session> {
        let mut session = self.connect(target).await?;
        if let Err(e) = session.enable(target.secret()).await {
            if let Err(close_err) = session.close().await {
                debug!(host = target.host(), error = %close_err, "close after failed enable");
            }
            return Err(e);
        }
        Ok(session)
    }
}
