//! In-memory stand-in for a deployment host.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;

use appdeploy::config::DeployConfig;
use appdeploy::error::RemoteCommandFailedDetails;
use appdeploy::exec::{RemoteCommand, RemoteExecutor, RemoteFilesystem};
use appdeploy::ssh::CommandOutput;
use appdeploy::sync::{FileSyncer, SyncRequest};
use appdeploy::target::DeploymentTarget;
use appdeploy::{Error, Result};

pub const HOST: &str = "dev.example.com";

/// Tracks which paths exist and which commands ran, in order.
///
/// Only the commands tasks actually issue are interpreted; everything else is
/// logged and succeeds.
#[derive(Default)]
pub struct FakeHost {
    paths: RefCell<BTreeSet<String>>,
    log: RefCell<Vec<String>>,
    fail_on: Option<String>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(paths: &[&str]) -> Self {
        let host = Self::new();
        for path in paths {
            host.insert(path);
        }
        host
    }

    /// Any command whose rendered form contains `needle` exits non-zero.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn has(&self, path: &str) -> bool {
        self.paths.borrow().contains(path)
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.log.borrow().iter().position(|entry| entry.contains(needle))
    }

    fn insert(&self, path: &str) {
        self.paths.borrow_mut().insert(path.to_string());
    }

    fn remove_tree(&self, path: &str) {
        let prefix = format!("{}/", path);
        self.paths
            .borrow_mut()
            .retain(|p| p != path && !p.starts_with(&prefix));
    }

    fn apply(&self, command: &RemoteCommand) {
        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        match (command.program.as_str(), args.as_slice()) {
            ("mkdir", ["-p", path]) => self.insert(path),
            ("rm", ["-rf", path]) => self.remove_tree(path),
            ("rm", [path]) => self.remove_tree(path),
            // The link itself exists whether or not its target does.
            ("ln", ["-sf", _source, link]) => self.insert(link),
            ("virtualenv", [dir, ..]) => {
                if let Some(cwd) = &command.cwd {
                    self.insert(&format!("{}/{}", cwd, dir));
                }
            }
            _ => {}
        }
    }
}

impl RemoteExecutor for FakeHost {
    fn run(&self, command: &RemoteCommand) -> Result<CommandOutput> {
        let rendered = command.to_shell();
        self.log.borrow_mut().push(rendered.clone());

        if let Some(needle) = &self.fail_on {
            if rendered.contains(needle.as_str()) {
                return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
                    command: rendered,
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "simulated failure".to_string(),
                    host: HOST.to_string(),
                }));
            }
        }

        self.apply(command);
        Ok(CommandOutput {
            success: true,
            ..CommandOutput::default()
        })
    }
}

impl RemoteFilesystem for FakeHost {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.has(path))
    }
}

impl FileSyncer for FakeHost {
    fn sync(&self, request: &SyncRequest) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("sync {} {}", request.local_dir, request.remote_dir));
        self.insert(&format!("{}/etc/nginx.conf", request.remote_dir));
        self.insert(&format!("{}/etc/supervisor.conf", request.remote_dir));
        self.insert(&format!("{}/requirements.txt", request.remote_dir));
        Ok(())
    }
}

/// Target rooted at `local_dir` with a short package list.
pub fn target(local_dir: &Path) -> DeploymentTarget {
    DeployConfig {
        host: HOST.to_string(),
        app_user: "deploy".to_string(),
        app_name: "blog".to_string(),
        packages: vec!["nginx".to_string(), "supervisor".to_string()],
        ..DeployConfig::default()
    }
    .into_target(local_dir.to_path_buf())
    .unwrap()
}
