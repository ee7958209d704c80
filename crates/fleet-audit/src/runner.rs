//! Fleet runner: one concurrent task per device, then wait for all of them

use audit_config::{CommandErrorPolicy, Inventory};
use device_session::Connector;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{AuditError, Result};
use crate::report::ReportWriter;
use crate::task::{DeviceTask, TaskOutcome};

/// Counts of how device tasks ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Reports written from a complete command sequence
    pub reported: usize,
    /// Reports written from a sequence cut short by a command failure
    pub partial: usize,
    /// Devices with nothing to report
    pub empty: usize,
    /// Devices that ended without a report because of an error
    pub failed: usize,
}

impl RunSummary {
    /// Count one outcome
    pub fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Reported { aborted: None, .. } => self.reported += 1,
            TaskOutcome::Reported { aborted: Some(_), .. } => self.partial += 1,
            TaskOutcome::Empty => self.empty += 1,
            TaskOutcome::Failed(_) | TaskOutcome::Unwritten { .. } => self.failed += 1,
        }
    }

    /// Devices accounted for
    pub fn total(&self) -> usize {
        self.reported + self.partial + self.empty + self.failed
    }
}

/// Runs device tasks for a whole inventory
///
/// Tasks share nothing mutable: each gets its own session, and the connector and
/// report writer are shared read-only.
pub struct FleetRunner<C: Connector> {
    connector: Arc<C>,
    writer: Arc<ReportWriter>,
    policy: CommandErrorPolicy,
    max_concurrency: Option<usize>,
}

impl<C: Connector> FleetRunner<C> {
    /// Create a runner; unbounded concurrency, partial reports on command failure
    pub fn new(connector: C, writer: ReportWriter) -> Self {
        Self {
            connector: Arc::new(connector),
            writer: Arc::new(writer),
            policy: CommandErrorPolicy::default(),
            max_concurrency: None,
        }
    }

    /// Limit how many devices are audited at once; `None` launches all eagerly
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit.filter(|&n| n > 0);
        self
    }

    /// Set the mid-sequence command failure policy
    pub fn with_command_error_policy(mut self, policy: CommandErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build one task per asset, resolving its command list by device type
    ///
    /// Assets whose type has no command list come back as errors.
    pub fn plan(&self, inventory: &Inventory) -> (Vec<DeviceTask>, Vec<AuditError>) {
        let mut tasks = Vec::with_capacity(inventory.assets.len());
        let mut unplanned = Vec::new();

        for asset in &inventory.assets {
            match inventory.commands_for(&asset.device_type) {
                Some(commands) => {
                    tasks.push(DeviceTask::new(asset.session_target(), commands, self.policy))
                }
                None => unplanned.push(AuditError::MissingCommands {
                    host: asset.host.clone(),
                    device_type: asset.device_type.clone(),
                }),
            }
        }

        (tasks, unplanned)
    }

    /// Audit every device in the inventory and wait for all of them
    ///
    /// Only failing to create the report directory is an error; per-device
    /// failures are logged and counted in the summary.
    pub async fn run(&self, inventory: &Inventory) -> Result<RunSummary> {
        self.writer.ensure_dir().await?;

        let mut summary = RunSummary::default();
        let (tasks, unplanned) = self.plan(inventory);
        for err in unplanned {
            error!(host = err.host(), error = %err, "Device skipped");
            summary.record(&TaskOutcome::Failed(err));
        }

        info!(
            devices = tasks.len(),
            max_concurrency = ?self.max_concurrency,
            dir = %self.writer.dir().display(),
            "Starting audit"
        );

        let spawn = |task: DeviceTask| {
            let connector = Arc::clone(&self.connector);
            let writer = Arc::clone(&self.writer);
            smol::spawn(async move { task.run(connector.as_ref(), &writer).await })
        };

        let outcomes: Vec<TaskOutcome> = match self.max_concurrency {
            None => {
                let handles: Vec<_> = tasks.into_iter().map(spawn).collect();
                join_all(handles).await
            }
            Some(limit) => {
                stream::iter(tasks)
                    .map(spawn)
                    .buffer_unordered(limit)
                    .collect()
                    .await
            }
        };

        for outcome in &outcomes {
            summary.record(outcome);
        }

        info!(
            reported = summary.reported,
            partial = summary.partial,
            empty = summary.empty,
            failed = summary.failed,
            "Audit finished"
        );
        Ok(summary)
    }
}
