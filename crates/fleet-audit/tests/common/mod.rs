//! Common test utilities: an in-memory connector with scripted devices

#![allow(dead_code)]

use async_trait::async_trait;
use device_session::{Connector, Error, Result, Session, SessionTarget};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn cli_key(command: &str) -> String {
    command.trim().to_lowercase()
}

/// How one fake device behaves
#[derive(Debug, Clone, Default)]
pub struct DeviceScript {
    responses: HashMap<String, String>,
    refuse: bool,
    reject_enable: bool,
    fail_on: Option<String>,
    delay: Option<Duration>,
}

impl DeviceScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output returned for `command`; unknown commands return ""
    ///
    /// Commands are looked up trimmed and case-insensitively, like a device CLI.
    pub fn respond(mut self, command: &str, output: &str) -> Self {
        self.responses.insert(cli_key(command), output.to_string());
        self
    }

    /// Refuse the connection
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Reject the enable secret
    pub fn rejecting_enable(mut self) -> Self {
        self.reject_enable = true;
        self
    }

    /// Drop the session when `command` is sent
    pub fn failing_on(mut self, command: &str) -> Self {
        self.fail_on = Some(cli_key(command));
        self
    }

    /// Sleep before answering each command
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct Shared {
    sent: Mutex<HashMap<String, Vec<String>>>,
    closed: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Connector handing out [`ScriptedSession`]s; clones share their records
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    devices: HashMap<String, DeviceScript>,
    shared: Arc<Shared>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device; unregistered hosts refuse connections
    pub fn device(mut self, host: &str, script: DeviceScript) -> Self {
        self.devices.insert(host.to_string(), script);
        self
    }

    /// Commands actually sent to `host`, in order
    pub fn sent(&self, host: &str) -> Vec<String> {
        self.shared
            .sent
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a session to `host` was closed
    pub fn closed(&self, host: &str) -> bool {
        self.shared.closed.lock().unwrap().iter().any(|h| h == host)
    }

    /// Most sessions open at the same time
    pub fn peak(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self, target: &SessionTarget) -> Result<ScriptedSession> {
        let script = match self.devices.get(target.host()) {
            Some(script) if !script.refuse => script.clone(),
            _ => {
                return Err(Error::connection_failed(
                    target.host(),
                    "Connection refused",
                ));
            }
        };

        let active = self.shared.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak.fetch_max(active, Ordering::SeqCst);

        Ok(ScriptedSession {
            host: target.host().to_string(),
            script,
            shared: Arc::clone(&self.shared),
            open: true,
        })
    }
}

/// A session answering from a [`DeviceScript`]
pub struct ScriptedSession {
    host: String,
    script: DeviceScript,
    shared: Arc<Shared>,
    open: bool,
}

#[async_trait]
impl Session for ScriptedSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn enable(&mut self, _secret: &str) -> Result<()> {
        if self.script.reject_enable {
            return Err(Error::PrivilegeEscalationFailed {
                host: self.host.clone(),
                reason: "% Access denied".to_string(),
            });
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<String> {
        self.shared
            .sent
            .lock()
            .unwrap()
            .entry(self.host.clone())
            .or_default()
            .push(command.to_string());

        if let Some(delay) = self.script.delay {
            async_io::Timer::after(delay).await;
        }

        let key = cli_key(command);
        if self.script.fail_on.as_deref() == Some(key.as_str()) {
            return Err(Error::SessionClosed {
                host: self.host.clone(),
                command: command.to_string(),
            });
        }

        Ok(self.script.responses.get(&key).cloned().unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.shared.active.fetch_sub(1, Ordering::SeqCst);
            self.shared.closed.lock().unwrap().push(self.host.clone());
        }
        Ok(())
    }
}

/// Report files in `dir` whose names end with `_<host>.html`
pub fn reports_for(dir: &Path, host: &str) -> Vec<PathBuf> {
    let suffix = format!("_{}.html", host);
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(&suffix))
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}
