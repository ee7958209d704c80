//! Command type for building the session client invocation

use async_process::{Command as AsyncCommand, Stdio};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};

/// A client program invocation
///
/// Built up by a connector and converted to an `async_process::Command` when the
/// session is opened. Environment values are kept out of [`Command::display`] so the
/// invocation can be logged without leaking credentials.
#[derive(Debug, Clone)]
pub struct Command {
    /// The program to execute
    program: OsString,
    /// The arguments to pass to the program
    args: Vec<OsString>,
    /// Environment variables to set
    env: HashMap<OsString, OsString>,
}

impl Command {
    /// Create a new command for the given program
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }

    /// Set an environment variable
    pub fn env<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.env
            .insert(key.as_ref().to_owned(), val.as_ref().to_owned());
        self
    }

    /// Get the program name
    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    /// Get the arguments
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Get the environment variables
    pub fn get_envs(&self) -> &HashMap<OsString, OsString> {
        &self.env
    }

    /// Program and arguments joined for logging; environment is never included
    pub fn display(&self) -> String {
        let mut out = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }

    /// Convert to an `async_process::Command` with all three stdio streams piped
    ///
    /// The child is killed when its handle is dropped, so a session abandoned on an
    /// error path never outlives its owner.
    pub fn prepare(&self) -> AsyncCommand {
        let mut cmd = AsyncCommand::new(&self.program);
        cmd.args(&self.args);
        for (key, val) in &self.env {
            cmd.env(key, val);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_with_args() {
        let mut cmd = Command::new("ssh");
        cmd.arg("-p").arg("2222");

        assert_eq!(cmd.get_args().len(), 2);
        assert_eq!(cmd.get_args()[0], "-p");
        assert_eq!(cmd.get_args()[1], "2222");
    }

    #[test]
    fn test_password_goes_to_environment() {
        let mut cmd = Command::new("sshpass");
        cmd.arg("-e")
            .args(["ssh", "admin@10.0.0.1"])
            .env("SSHPASS", "hunter2");

        assert_eq!(cmd.get_program(), "sshpass");
        assert_eq!(cmd.get_args().len(), 3);
        assert_eq!(
            cmd.get_envs().get(OsStr::new("SSHPASS")),
            Some(&OsString::from("hunter2"))
        );
    }

    #[test]
    fn test_display_hides_environment() {
        let mut cmd = Command::new("sshpass");
        cmd.arg("-e").arg("ssh").env("SSHPASS", "hunter2");

        let shown = cmd.display();
        assert_eq!(shown, "sshpass -e ssh");
        assert!(!shown.contains("hunter2"));
    }
}
