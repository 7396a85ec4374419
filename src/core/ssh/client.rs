use crate::error::{Error, RemoteCommandFailedDetails, Result, SshConnectFailedDetails};
use crate::exec::{RemoteCommand, RemoteExecutor, RemoteFilesystem};
use crate::target::DeploymentTarget;
use crate::utils::shell;
use std::process::Command;

/// ssh's own exit status for transport failures.
const SSH_CONNECTION_EXIT: i32 = 255;

pub struct SshClient {
    pub host: String,
    /// Login user. `None` defers to ~/.ssh/config.
    pub user: Option<String>,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl SshClient {
    pub fn from_target(target: &DeploymentTarget) -> Result<Self> {
        if target.host.is_empty() {
            return Err(Error::config_missing_key("host", None)
                .with_hint("Pass --host or set \"host\" in appdeploy.json"));
        }

        let identity_file = match &target.identity_file {
            Some(path) if !path.is_empty() => {
                if !std::path::Path::new(path).exists() {
                    return Err(Error::ssh_identity_file_not_found(
                        target.host.clone(),
                        path.clone(),
                    ));
                }
                Some(path.clone())
            }
            _ => None,
        };

        let is_local = is_local_host(&target.host);
        if is_local {
            log_status!("ssh", "Host '{}' is localhost, using local execution", target.host);
        }

        Ok(Self {
            host: target.host.clone(),
            user: target.user.clone(),
            port: target.port,
            identity_file,
            is_local,
        })
    }

    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// Connection options shared by ssh itself and by rsync's `--rsh`.
    pub fn connection_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Never block on prompts; drop stalled connections.
        args.extend(
            [
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-o",
                "ServerAliveInterval=15",
                "-o",
                "ServerAliveCountMax=3",
            ]
            .map(String::from),
        );

        args
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.connection_args();
        args.push("--".to_string());
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    /// Run a rendered command and capture its output. Never retries.
    pub fn execute(&self, command: &str) -> CommandOutput {
        if self.is_local {
            return execute_local_command(command);
        }

        let output = Command::new("ssh").args(self.build_ssh_args(command)).output();

        match output {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stdout: String::new(),
                stderr: format!("SSH error: {}", e),
                success: false,
                exit_code: -1,
            },
        }
    }

    fn is_connection_failure(&self, output: &CommandOutput) -> bool {
        !self.is_local && (output.exit_code == SSH_CONNECTION_EXIT || output.exit_code == -1)
    }

    fn connect_error(&self, command: &str, output: CommandOutput) -> Error {
        Error::ssh_connect_failed(SshConnectFailedDetails {
            host: self.host.clone(),
            command: command.to_string(),
            stderr: output.stderr,
        })
    }
}

impl RemoteExecutor for SshClient {
    fn run(&self, command: &RemoteCommand) -> Result<CommandOutput> {
        let rendered = command.to_shell();
        let output = self.execute(&rendered);

        if output.success {
            return Ok(output);
        }

        if self.is_connection_failure(&output) {
            return Err(self.connect_error(&rendered, output));
        }

        let err = Error::remote_command_failed(RemoteCommandFailedDetails {
            command: rendered,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            host: self.host.clone(),
        });

        if command.privileged {
            Err(err.with_hint(
                "Privileged commands use 'sudo -n'; the login user needs passwordless sudo",
            ))
        } else {
            Err(err)
        }
    }
}

impl RemoteFilesystem for SshClient {
    fn exists(&self, path: &str) -> Result<bool> {
        // -L catches links whose target is already gone.
        let quoted = shell::quote_path(path);
        let rendered = format!("test -e {} || test -L {}", quoted, quoted);
        let output = self.execute(&rendered);
        self.exists_status(rendered, output)
    }
}

impl SshClient {
    /// `test` exits 0 or 1; anything else means the check itself failed.
    fn exists_status(&self, command: String, output: CommandOutput) -> Result<bool> {
        match output.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            _ if self.is_connection_failure(&output) => Err(self.connect_error(&command, output)),
            code => Err(Error::remote_command_failed(RemoteCommandFailedDetails {
                command,
                exit_code: code,
                stdout: output.stdout,
                stderr: output.stderr,
                host: self.host.clone(),
            })),
        }
    }
}

pub fn execute_local_command(command: &str) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    match cmd.output() {
        Ok(out) => CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        },
        Err(e) => CommandOutput {
            stdout: String::new(),
            stderr: format!("Command error: {}", e),
            success: false,
            exit_code: -1,
        },
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}
