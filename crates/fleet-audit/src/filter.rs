//! Output filters applied to command output before it goes into a report
//!
//! Rules are chosen by exact, case-insensitive match on the trimmed command
//! text. Anything unrecognised passes through unchanged.

/// Command whose output keeps only lines mentioning `down`
pub const INTERFACES_ALIAS: &str = "show interfaces alias";

/// Command whose output keeps only lines mentioning `full`
pub const INTERFACES_STATUS: &str = "show interfaces status";

/// Command that is never sent to a device
pub const RUNNING_DIRECTORY: &str = "show running-directory";

/// Filter for command output lines
pub trait LineFilter: Send + Sync {
    /// Filter a line, returning None to drop it
    ///
    /// The returned &str can be the same as the input (pass-through)
    /// or a substring of it (partial filtering).
    fn filter<'a>(&self, line: &'a str) -> Option<&'a str>;
}

/// A no-op filter that passes all lines through
pub struct NoOpFilter;

impl LineFilter for NoOpFilter {
    fn filter<'a>(&self, line: &'a str) -> Option<&'a str> {
        Some(line)
    }
}

/// Keeps lines containing a lower-case needle, ignoring case
pub struct ContainsFilter {
    needle: &'static str,
}

impl ContainsFilter {
    /// Create a filter for a lower-case needle
    pub const fn new(needle: &'static str) -> Self {
        Self { needle }
    }
}

impl LineFilter for ContainsFilter {
    fn filter<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.to_lowercase().contains(self.needle).then_some(line)
    }
}

static DOWN_LINES: ContainsFilter = ContainsFilter::new("down");
static FULL_LINES: ContainsFilter = ContainsFilter::new("full");

/// How a command is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRule {
    /// Not sent at all
    Skip,
    /// Only lines containing `down`
    DownLines,
    /// Only lines containing `full`
    FullLines,
    /// Output used as is
    PassThrough,
}

impl CommandRule {
    /// Pick the rule for a command
    pub fn for_command(command: &str) -> Self {
        match command.trim().to_lowercase().as_str() {
            RUNNING_DIRECTORY => CommandRule::Skip,
            INTERFACES_ALIAS => CommandRule::DownLines,
            INTERFACES_STATUS => CommandRule::FullLines,
            _ => CommandRule::PassThrough,
        }
    }

    /// Whether the command is sent to the device
    pub fn is_sent(self) -> bool {
        self != CommandRule::Skip
    }

    /// Transform raw output according to this rule
    pub fn apply(self, raw: &str) -> String {
        match self {
            CommandRule::DownLines => filter_lines(raw, &DOWN_LINES),
            CommandRule::FullLines => filter_lines(raw, &FULL_LINES),
            CommandRule::PassThrough | CommandRule::Skip => filter_lines(raw, &NoOpFilter),
        }
    }
}

/// Apply a line filter and join the surviving lines with `\n`
///
/// Yields an empty string when nothing survives.
pub fn filter_lines(raw: &str, filter: &dyn LineFilter) -> String {
    raw.split('\n')
        .filter_map(|line| filter.filter(line))
        .collect::<Vec<_>>()
        .join("\n")
}
