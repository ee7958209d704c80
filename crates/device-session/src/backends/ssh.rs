//! SSH session backend driving the system `ssh` client
//!
//! The client runs with a forced remote pty (`-tt`) and its stdio piped, so the
//! device CLI behaves as it would for an interactive operator. Password logins go
//! through `sshpass -e`, which reads the password from the `SSHPASS` environment
//! variable rather than argv. Without a password the client runs in batch mode and
//! relies on keys or an agent.

use async_io::Timer;
use async_process::{Child, ChildStderr, ChildStdin, ChildStdout};
use async_trait::async_trait;
use futures_lite::future;
use futures_lite::io::{AsyncReadExt, AsyncWriteExt};
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::command::Command;
use crate::connector::{Connector, Session};
use crate::error::{Error, Result};
use crate::profile::DeviceProfile;
use crate::screen::{self, Screen};
use crate::target::SessionTarget;

/// Exit code `sshpass` uses for a rejected password
const SSHPASS_BAD_PASSWORD: i32 = 5;

/// How long `close` waits for the client to exit before killing it
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Host key policy passed through as `StrictHostKeyChecking`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyChecking {
    /// Refuse unknown or changed keys
    Yes,
    /// Record unknown keys, refuse changed ones
    #[default]
    AcceptNew,
    /// Accept anything
    No,
}

impl HostKeyChecking {
    fn as_option(self) -> &'static str {
        match self {
            HostKeyChecking::Yes => "StrictHostKeyChecking=yes",
            HostKeyChecking::AcceptNew => "StrictHostKeyChecking=accept-new",
            HostKeyChecking::No => "StrictHostKeyChecking=no",
        }
    }
}

/// SSH client configuration shared by every session a connector opens
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Client program (normally `ssh`)
    program: PathBuf,
    /// Password helper program (normally `sshpass`)
    password_helper: PathBuf,
    /// Path to identity file (private key)
    identity_file: Option<PathBuf>,
    /// `ConnectTimeout` for the client
    connect_timeout: Option<Duration>,
    /// Longest wait for a prompt once connected; `None` waits forever
    read_timeout: Option<Duration>,
    /// Host key policy
    host_key_checking: HostKeyChecking,
    /// Additional SSH arguments
    extra_args: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ssh"),
            password_helper: PathBuf::from("sshpass"),
            identity_file: None,
            connect_timeout: None,
            read_timeout: None,
            host_key_checking: HostKeyChecking::default(),
            extra_args: Vec::new(),
        }
    }
}

impl SshConfig {
    /// Create a configuration using `ssh` and `sshpass` from `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different client program
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Use a different password helper
    pub fn with_password_helper(mut self, helper: impl Into<PathBuf>) -> Self {
        self.password_helper = helper.into();
        self
    }

    /// Set the identity file (private key)
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Set the client connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Bound every wait for a prompt
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the host key policy
    pub fn with_host_key_checking(mut self, policy: HostKeyChecking) -> Self {
        self.host_key_checking = policy;
        self
    }

    /// Add extra SSH arguments
    pub fn with_extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }
}

/// Opens [`SshSession`]s with the system ssh client
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    /// Create a connector with the given client configuration
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Build the client invocation for a target
    pub fn build_command(&self, target: &SessionTarget) -> Command {
        let config = &self.config;
        let mut ssh = Command::new(&config.program);

        ssh.arg("-tt").arg("-p").arg(target.port().to_string());
        ssh.arg("-o").arg(config.host_key_checking.as_option());

        if let Some(timeout) = config.connect_timeout {
            ssh.arg("-o")
                .arg(format!("ConnectTimeout={}", timeout.as_secs().max(1)));
        }

        if let Some(identity) = &config.identity_file {
            ssh.arg("-i").arg(identity);
        }

        if target.password().is_empty() {
            ssh.arg("-o").arg("BatchMode=yes");
        } else {
            ssh.arg("-o").arg("NumberOfPasswordPrompts=1");
        }

        for arg in &config.extra_args {
            ssh.arg(arg);
        }

        ssh.arg(target.login());

        if target.password().is_empty() {
            return ssh;
        }

        let mut wrapped = Command::new(&config.password_helper);
        wrapped
            .arg("-e")
            .arg(ssh.get_program())
            .args(ssh.get_args())
            .env("SSHPASS", target.password());
        wrapped
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, target: &SessionTarget) -> Result<SshSession> {
        let command = self.build_command(target);
        debug!(host = target.host(), command = %command.display(), "Opening session");

        let mut child = command.prepare().spawn().map_err(|e| {
            Error::spawn_failed(format!("{}: {}", command.get_program().to_string_lossy(), e))
        })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => return Err(Error::spawn_failed("session stdio was not captured")),
        };
        let stderr = child.stderr.take();

        let profile = DeviceProfile::for_device_type(target.device_type());
        let mut session = SshSession {
            host: target.host().to_string(),
            username: target.username().to_string(),
            child,
            stdin,
            stdout,
            stderr,
            screen: Screen::new(),
            profile,
            prompt: profile.prompt_regex()?,
            password_prompt: password_prompt()?,
            read_timeout: self.config.read_timeout,
            current_prompt: String::new(),
            closed: false,
        };

        match session.read_until(Expect::Prompt).await {
            Ok(_) => {}
            Err(Error::SessionClosed { .. }) => return Err(session.login_failure().await),
            Err(e) => return Err(e),
        }

        if let Some(paging) = profile.paging_command {
            session.send_command(paging).await.map_err(|e| {
                Error::connection_failed(target.host(), format!("disabling paging: {}", e))
            })?;
        }

        debug!(host = target.host(), prompt = %session.current_prompt, "Session ready");
        Ok(session)
    }
}

fn password_prompt() -> Result<Regex> {
    const PATTERN: &str = r"(?i)password:\s*$";
    Regex::new(PATTERN).map_err(|source| Error::InvalidPattern {
        pattern: PATTERN.to_string(),
        source,
    })
}

/// What a read is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Prompt,
    PromptOrPassword,
}

/// What ended a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matched {
    Prompt,
    Password,
}

/// An interactive CLI session running over an `ssh` child process
pub struct SshSession {
    host: String,
    username: String,
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: Option<ChildStderr>,
    screen: Screen,
    profile: &'static DeviceProfile,
    prompt: Regex,
    password_prompt: Regex,
    read_timeout: Option<Duration>,
    current_prompt: String,
    closed: bool,
}

impl SshSession {
    /// The prompt seen at the end of the last read
    pub fn current_prompt(&self) -> &str {
        &self.current_prompt
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(limit) = self.read_timeout else {
            return Ok(self.stdout.read(buf).await?);
        };

        let host = self.host.clone();
        let read = async { self.stdout.read(buf).await.map_err(Error::from) };
        let expire = async move {
            Timer::after(limit).await;
            Err::<usize, _>(Error::Timeout {
                host,
                seconds: limit.as_secs(),
            })
        };
        future::or(read, expire).await
    }

    /// Read until the last line matches what we expect, returning the cleaned text
    async fn read_until(&mut self, expect: Expect) -> Result<(String, Matched)> {
        let mut buf = [0u8; 4096];
        loop {
            let tail = self.screen.last_line();
            if self.prompt.is_match(tail.trim_end()) {
                self.current_prompt = tail.trim().to_string();
                return Ok((self.screen.take(), Matched::Prompt));
            }
            if expect == Expect::PromptOrPassword && self.password_prompt.is_match(&tail) {
                return Ok((self.screen.take(), Matched::Password));
            }

            let n = self.read_chunk(&mut buf).await?;
            if n == 0 {
                return Err(Error::SessionClosed {
                    host: self.host.clone(),
                    command: String::new(),
                });
            }
            trace!(host = %self.host, bytes = n, "read");
            self.screen.push(&buf[..n]);
        }
    }

    /// Turn an early end of stream into a connection or authentication error
    async fn login_failure(&mut self) -> Error {
        let mut stderr = String::new();
        if let Some(mut pipe) = self.stderr.take() {
            if let Err(e) = pipe.read_to_string(&mut stderr).await {
                debug!(host = %self.host, error = %e, "reading client stderr");
            }
        }
        let leftover = self.screen.take();
        let code = self.child.status().await.ok().and_then(|s| s.code());
        self.closed = true;

        let stderr = stderr.trim();
        if code == Some(SSHPASS_BAD_PASSWORD) || stderr.contains("Permission denied") {
            return Error::AuthenticationFailed {
                host: self.host.clone(),
                username: self.username.clone(),
            };
        }

        let reason = [stderr, leftover.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("client exited with status {:?}", code));
        Error::connection_failed(self.host.clone(), reason)
    }
}

#[async_trait]
impl Session for SshSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn enable(&mut self, secret: &str) -> Result<()> {
        let Some(enable) = self.profile.enable_command else {
            return Ok(());
        };
        if self.profile.is_privileged(&self.current_prompt) {
            return Ok(());
        }

        let escalation_failed = |host: &str, reason: String| Error::PrivilegeEscalationFailed {
            host: host.to_string(),
            reason,
        };

        self.write_line(enable).await?;
        let (_, matched) = self.read_until(Expect::PromptOrPassword).await?;
        if matched == Matched::Password {
            self.write_line(secret).await?;
            let (answer, matched) = self.read_until(Expect::PromptOrPassword).await?;
            if matched == Matched::Password {
                return Err(escalation_failed(&self.host, "secret rejected".to_string()));
            }
            if !self.profile.is_privileged(&self.current_prompt) {
                let reason = screen::command_output(&answer, "").trim().to_string();
                return Err(escalation_failed(&self.host, reason));
            }
        }

        if !self.profile.is_privileged(&self.current_prompt) {
            return Err(escalation_failed(
                &self.host,
                format!("still at unprivileged prompt '{}'", self.current_prompt),
            ));
        }
        debug!(host = %self.host, "Entered privileged mode");
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<String> {
        if self.closed {
            return Err(Error::SessionClosed {
                host: self.host.clone(),
                command: command.to_string(),
            });
        }

        self.write_line(command).await?;
        match self.read_until(Expect::Prompt).await {
            Ok((captured, _)) => Ok(screen::command_output(&captured, command)),
            Err(Error::SessionClosed { host, .. }) => {
                self.closed = true;
                Err(Error::SessionClosed {
                    host,
                    command: command.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // the device may already have hung up
        if let Err(e) = self.write_line(self.profile.exit_command).await {
            debug!(host = %self.host, error = %e, "sending exit");
        }

        let exited = async { self.child.status().await.map(Some) };
        let grace = async {
            Timer::after(CLOSE_GRACE).await;
            Ok(None)
        };
        let outcome = future::or(exited, grace).await?;
        match outcome {
            Some(status) => debug!(host = %self.host, %status, "Session closed"),
            None => {
                warn!(host = %self.host, "ssh client did not exit, killing it");
                self.child.kill()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_key_based_invocation() {
        let connector = SshConnector::new(SshConfig::new().with_identity_file("/keys/id_ed25519"));
        let target = SessionTarget::new("10.0.0.1", "cisco_ios").with_username("admin");

        let command = connector.build_command(&target);
        assert_eq!(command.get_program(), "ssh");
        let args = args(&command);
        assert_eq!(args[..3], ["-tt", "-p", "22"]);
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"/keys/id_ed25519".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("admin@10.0.0.1"));
        assert!(command.get_envs().is_empty());
    }

    #[test]
    fn test_password_invocation_uses_sshpass_env() {
        let connector = SshConnector::new(
            SshConfig::new()
                .with_connect_timeout(Duration::from_secs(10))
                .with_host_key_checking(HostKeyChecking::No),
        );
        let target = SessionTarget::new("10.0.0.2", "hp_procurve")
            .with_username("ops")
            .with_password("hunter2")
            .with_port(2222);

        let command = connector.build_command(&target);
        assert_eq!(command.get_program(), "sshpass");
        let args = args(&command);
        assert_eq!(args[..2], ["-e", "ssh"]);
        assert!(args.contains(&"2222".to_string()));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(!args.iter().any(|a| a.contains("hunter2")));
        assert_eq!(
            command.get_envs().get(OsStr::new("SSHPASS")).map(|v| v.to_string_lossy().into_owned()),
            Some("hunter2".to_string())
        );
    }

    #[test]
    fn test_extra_args_precede_login() {
        let connector = SshConnector::new(
            SshConfig::new().with_extra_arg("-o").with_extra_arg("KexAlgorithms=+diffie-hellman-group1-sha1"),
        );
        let target = SessionTarget::new("legacy-sw", "cisco_ios");
        let args = args(&connector.build_command(&target));
        let n = args.len();
        assert_eq!(args[n - 3], "-o");
        assert_eq!(args[n - 2], "KexAlgorithms=+diffie-hellman-group1-sha1");
        assert_eq!(args[n - 1], "legacy-sw");
    }
}
