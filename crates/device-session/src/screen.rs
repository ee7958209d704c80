//! Accumulation and cleanup of raw terminal output

/// Bytes received from the device since the last prompt
#[derive(Debug, Default)]
pub struct Screen {
    raw: Vec<u8>,
}

impl Screen {
    /// Create an empty screen
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.raw.extend_from_slice(bytes);
    }

    /// The cleaned text after the last newline, i.e. whatever the device is
    /// currently waiting on (a prompt, a password request, or partial output)
    pub fn last_line(&self) -> String {
        let start = self
            .raw
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        clean(&String::from_utf8_lossy(&self.raw[start..]))
    }

    /// Drain everything received so far as cleaned text
    pub fn take(&mut self) -> String {
        let text = clean(&String::from_utf8_lossy(&self.raw));
        self.raw.clear();
        text
    }
}

/// Strip ANSI escape sequences, carriage returns and backspaces
pub fn clean(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    // CSI: parameters until a final byte in '@'..='~'
                    for next in chars.by_ref() {
                        if ('@'..='~').contains(&next) {
                            break;
                        }
                    }
                } else {
                    chars.next();
                }
            }
            '\r' => {}
            '\u{8}' => {
                out.pop();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Extract a command's output from the screen text captured after sending it
///
/// Drops the echoed command line at the top and the prompt line at the bottom.
pub fn command_output(captured: &str, command: &str) -> String {
    let mut lines: Vec<&str> = captured.split('\n').collect();

    // trailing prompt
    lines.pop();

    let echoed = lines
        .first()
        .is_some_and(|first| !command.trim().is_empty() && first.contains(command.trim()));
    if echoed {
        lines.remove(0);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_escapes() {
        assert_eq!(clean("\u{1b}[1;32mGi1\u{1b}[0m up\r\n"), "Gi1 up\n");
        assert_eq!(clean("abc\u{8}d"), "abd");
    }

    #[test]
    fn test_last_line_tracks_partial_output() {
        let mut screen = Screen::new();
        screen.push(b"show version\r\nCisco IOS\r\nsw1");
        assert_eq!(screen.last_line(), "sw1");
        screen.push(b"#");
        assert_eq!(screen.last_line(), "sw1#");
    }

    #[test]
    fn test_take_drains() {
        let mut screen = Screen::new();
        screen.push(b"a\r\nb");
        assert_eq!(screen.take(), "a\nb");
        assert_eq!(screen.last_line(), "");
    }

    #[test]
    fn test_command_output_removes_echo_and_prompt() {
        let captured = "show interfaces status\nGi1 full\nGi2 half\nsw1#";
        assert_eq!(
            command_output(captured, "show interfaces status"),
            "Gi1 full\nGi2 half"
        );
    }

    #[test]
    fn test_command_output_without_echo() {
        assert_eq!(command_output("OK\nsw1#", "show version"), "OK");
        assert_eq!(command_output("sw1#", "show clock"), "");
    }
}
