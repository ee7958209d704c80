//! # Fleet Audit
//!
//! Connects to every device in an inventory, runs the diagnostic commands for
//! its device type, filters their output down to the actionable lines and writes
//! one HTML report per device.
//!
//! The pipeline is [`FleetRunner`] → [`DeviceTask`] → a
//! [`Connector`](device_session::Connector) session → [`filter`] → [`ReportWriter`].

#![warn(missing_docs)]

pub mod error;
pub mod filter;
pub mod report;
pub mod runner;
pub mod task;

pub use error::{AuditError, Result};
pub use filter::CommandRule;
pub use report::{CommandResult, DeviceReport, ReportTemplate, ReportWriter, DEFAULT_LOG_DIR};
pub use runner::{FleetRunner, RunSummary};
pub use task::{DeviceTask, TaskOutcome, TaskState};
