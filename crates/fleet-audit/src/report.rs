//! Report assembly and HTML rendering

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AuditError, Result};
use crate::filter::CommandRule;

/// Default report directory
pub const DEFAULT_LOG_DIR: &str = "LOG-HTML";

/// Placeholder replaced by the escaped command outputs
pub const OUTPUTS_PLACEHOLDER: &str = "{{command_outputs}}";

/// Placeholder replaced by the generation time
pub const GENERATION_TIME_PLACEHOLDER: &str = "{{generation_time}}";

const BUILTIN_TEMPLATE: &str = include_str!("../templates/report.html");

/// Output of one executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// The command as listed in the inventory
    pub command: String,
    /// Output as received from the device
    pub raw_output: String,
    /// Output after the command's filter rule
    pub filtered_output: String,
}

impl CommandResult {
    /// Build a result, applying the command's filter rule to `raw_output`
    pub fn new(command: impl Into<String>, raw_output: impl Into<String>) -> Self {
        let command = command.into();
        let raw_output = raw_output.into();
        let filtered_output = CommandRule::for_command(&command).apply(&raw_output);
        Self {
            command,
            raw_output,
            filtered_output,
        }
    }
}

/// Accumulated report text for one device
#[derive(Debug, Clone)]
pub struct DeviceReport {
    host: String,
    body: String,
}

impl DeviceReport {
    /// Start an empty report
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            body: String::new(),
        }
    }

    /// Append one command block
    pub fn push(&mut self, result: &CommandResult) {
        self.body.push_str(&format!(
            "{}\tCommand: {}\n{}\n\n",
            self.host, result.command, result.filtered_output
        ));
    }

    /// Device address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Report text so far
    pub fn body(&self) -> &str {
        &self.body
    }

    /// True if there is nothing but whitespace to report
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// HTML escape matching the usual five-character set
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Report file name: `<YYYY-MM-DD_HH-MM-SS>_<host>.html`
pub fn report_file_name(host: &str, at: &DateTime<Local>) -> String {
    let host: String = host
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}_{}.html", at.format("%Y-%m-%d_%H-%M-%S"), host)
}

/// An immutable report template shared by all device tasks
#[derive(Debug, Clone)]
pub struct ReportTemplate {
    content: Arc<str>,
}

impl ReportTemplate {
    /// Wrap template text
    pub fn new(content: impl Into<Arc<str>>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// The template bundled with the binary
    pub fn builtin() -> Self {
        Self::new(BUILTIN_TEMPLATE)
    }

    /// Load a template from disk
    pub async fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let content = async_fs::read_to_string(path).await?;
        Ok(Self::new(content))
    }

    /// Substitute the escaped body and the generation time
    pub fn render(&self, body: &str, generated_at: &DateTime<Local>) -> String {
        let outputs = format!("<pre>{}</pre>", escape_html(body));
        let time = generated_at.format("%Y-%m-%d %H:%M:%S").to_string();
        // time first, so a device cannot inject a placeholder through its output
        self.content
            .replace(GENERATION_TIME_PLACEHOLDER, &time)
            .replace(OUTPUTS_PLACEHOLDER, &outputs)
    }
}

/// Writes rendered reports into the report directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    template: ReportTemplate,
}

impl ReportWriter {
    /// Create a writer for `dir`
    pub fn new(dir: impl Into<PathBuf>, template: ReportTemplate) -> Self {
        Self {
            dir: dir.into(),
            template,
        }
    }

    /// Report directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the report directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<()> {
        async_fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| AuditError::ReportDir {
                path: self.dir.clone(),
                source,
            })
    }

    /// Render and write one device's report, returning the file path
    pub async fn write(&self, report: &DeviceReport, at: &DateTime<Local>) -> Result<PathBuf> {
        let path = self.dir.join(report_file_name(report.host(), at));
        let html = self.template.render(report.body(), at);
        debug!(host = report.host(), path = %path.display(), bytes = html.len(), "Writing report");

        match async_fs::write(&path, html).await {
            Ok(()) => Ok(path),
            Err(source) => Err(AuditError::Render {
                host: report.host().to_string(),
                path,
                source,
            }),
        }
    }
}
