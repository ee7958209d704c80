//! Per-device audit task
//!
//! A task walks `Connecting → Executing → Rendering → Done`, or ends in `Failed`
//! from either of the first two states. Every error is caught and logged here;
//! the runner only sees a [`TaskOutcome`].

use audit_config::CommandErrorPolicy;
use chrono::Local;
use device_session::{Connector, Session, SessionTarget};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::error::AuditError;
use crate::filter::CommandRule;
use crate::report::{CommandResult, DeviceReport, ReportWriter};

/// Lifecycle of a device task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Opening the session and entering privileged mode
    Connecting,
    /// Sending commands
    Executing,
    /// Writing the report
    Rendering,
    /// Finished, with or without a report
    Done,
    /// Ended without a report because of an error
    Failed,
}

/// How a device task ended
#[derive(Debug)]
pub enum TaskOutcome {
    /// A report was written
    Reported {
        /// Report file
        path: PathBuf,
        /// The command failure that cut the sequence short, if any
        aborted: Option<AuditError>,
    },
    /// Every command produced empty output; no report written
    Empty,
    /// No report because connecting or a command failed
    Failed(AuditError),
    /// Output was collected but the report file could not be written
    Unwritten {
        /// The write error
        error: AuditError,
        /// The command failure that had already cut the sequence short, if any
        aborted: Option<AuditError>,
    },
}

/// One device's audit: its session target and ordered command list
#[derive(Debug, Clone)]
pub struct DeviceTask {
    target: SessionTarget,
    commands: Vec<String>,
    policy: CommandErrorPolicy,
}

impl DeviceTask {
    /// Create a task
    pub fn new(target: SessionTarget, commands: Vec<String>, policy: CommandErrorPolicy) -> Self {
        Self {
            target,
            commands,
            policy,
        }
    }

    /// Device address
    pub fn host(&self) -> &str {
        self.target.host()
    }

    fn enter(&self, state: TaskState) {
        debug!(host = self.host(), ?state, "Device task state");
    }

    /// Run the whole audit for this device
    pub async fn run<C: Connector>(self, connector: &C, writer: &ReportWriter) -> TaskOutcome {
        let host = self.host().to_string();

        self.enter(TaskState::Connecting);
        let mut session = match connector.open(&self.target).await {
            Ok(session) => session,
            Err(source) => {
                let err = AuditError::Connection { host, source };
                error!(host = err.host(), error = %err, "Connection failed");
                self.enter(TaskState::Failed);
                return TaskOutcome::Failed(err);
            }
        };

        self.enter(TaskState::Executing);
        let (report, aborted) = self.collect(&mut session).await;

        if let Err(e) = session.close().await {
            warn!(host = %host, error = %e, "Failed to close session cleanly");
        }

        if let Some(err) = aborted {
            error!(host = err.host(), error = %err, "Command sequence aborted");
            if self.policy == CommandErrorPolicy::Discard || report.is_empty() {
                self.enter(TaskState::Failed);
                return TaskOutcome::Failed(err);
            }
            return self.render(&report, writer, Some(err)).await;
        }

        self.render(&report, writer, None).await
    }

    async fn render(
        &self,
        report: &DeviceReport,
        writer: &ReportWriter,
        aborted: Option<AuditError>,
    ) -> TaskOutcome {
        self.enter(TaskState::Rendering);
        let outcome = if report.is_empty() {
            info!(host = self.host(), "No output to report");
            TaskOutcome::Empty
        } else {
            match writer.write(report, &Local::now()).await {
                Ok(path) => {
                    info!(host = self.host(), path = %path.display(), partial = aborted.is_some(), "Report written");
                    TaskOutcome::Reported { path, aborted }
                }
                Err(error) => {
                    error!(host = error.host(), error = %error, "Report not written");
                    TaskOutcome::Unwritten { error, aborted }
                }
            }
        };
        self.enter(TaskState::Done);
        outcome
    }

    /// Send every command in order and accumulate the report
    ///
    /// Stops at the first failing command and returns what was collected so far
    /// together with the error.
    pub async fn collect<S: Session>(&self, session: &mut S) -> (DeviceReport, Option<AuditError>) {
        let mut report = DeviceReport::new(self.host());

        for command in &self.commands {
            if !CommandRule::for_command(command).is_sent() {
                debug!(host = self.host(), command = %command, "Skipping command");
                continue;
            }

            match session.send_command(command).await {
                Ok(raw) => {
                    debug!(host = session.host(), command = %command, bytes = raw.len(), "Command done");
                    report.push(&CommandResult::new(command.as_str(), raw));
                }
                Err(source) => {
                    let err = AuditError::Command {
                        host: self.host().to_string(),
                        command: command.clone(),
                        source,
                    };
                    return (report, Some(err));
                }
            }
        }

        (report, None)
    }
}
