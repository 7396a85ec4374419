//! Structured remote commands and the capabilities tasks are given.
//!
//! Tasks never build shell strings. They describe a command as a program plus
//! an argument vector, and the executor quotes every argument when it has to
//! hand the command to a remote shell.

use std::fmt;

use crate::error::Result;
use crate::ssh::CommandOutput;
use crate::utils::shell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Run through `sudo` instead of as the login user.
    pub privileged: bool,
    /// Change into this directory first.
    pub cwd: Option<String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            privileged: false,
            cwd: None,
        }
    }

    /// Build from an argv list, e.g. a configured restart command.
    pub fn from_argv(argv: &[String]) -> Self {
        let mut iter = argv.iter();
        let program = iter.next().cloned().unwrap_or_default();
        Self::new(program).args(iter.cloned())
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn sudo(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn in_dir(mut self, dir: impl Into<String>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 4);
        if self.privileged {
            argv.extend(["sudo", "-n", "--"].map(String::from));
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Render for `sh -c` on the remote side, quoting each argument.
    pub fn to_shell(&self) -> String {
        let command = shell::quote_args(&self.argv());
        match &self.cwd {
            Some(dir) => format!("cd {} && {}", shell::quote_path(dir), command),
            None => command,
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell())
    }
}

/// Runs commands on the deployment host.
///
/// Implementations return `Err` for any non-zero exit. Nothing is retried.
pub trait RemoteExecutor {
    fn run(&self, command: &RemoteCommand) -> Result<CommandOutput>;
}

/// Read-only view of the host filesystem.
pub trait RemoteFilesystem {
    /// `Ok(false)` when the path is absent; `Err` only when the check itself fails.
    /// A dangling symlink counts as existing.
    fn exists(&self, path: &str) -> Result<bool>;
}

/// Executor that logs commands instead of running them.
///
/// Existence checks still go to the real host so the plan matches what a
/// real run would do.
pub struct DryRun<'a> {
    filesystem: &'a dyn RemoteFilesystem,
}

impl<'a> DryRun<'a> {
    pub fn new(filesystem: &'a dyn RemoteFilesystem) -> Self {
        Self { filesystem }
    }
}

impl RemoteExecutor for DryRun<'_> {
    fn run(&self, command: &RemoteCommand) -> Result<CommandOutput> {
        log_status!("dry-run", "{}", command);
        Ok(CommandOutput {
            success: true,
            ..CommandOutput::default()
        })
    }
}

impl RemoteFilesystem for DryRun<'_> {
    fn exists(&self, path: &str) -> Result<bool> {
        self.filesystem.exists(path)
    }
}
