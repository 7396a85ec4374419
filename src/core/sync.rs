//! One-way mirror of the local project onto the host.

use std::process::Command;

use crate::error::{Error, Result, SyncFailedDetails};
use crate::ssh::SshClient;
use crate::utils::{command, shell};

/// rsync options: preserve perms and times, recurse, verbose, compress.
const RSYNC_FLAGS: &str = "-pthrvz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Local directory whose *contents* are copied.
    pub local_dir: String,
    pub remote_dir: String,
    pub exclude: Vec<String>,
}

/// Copies files to the host. Source wins; remote-only files are left alone.
pub trait FileSyncer {
    fn sync(&self, request: &SyncRequest) -> Result<()>;
}

pub struct Rsync<'a> {
    client: &'a SshClient,
    dry_run: bool,
}

impl<'a> Rsync<'a> {
    pub fn new(client: &'a SshClient) -> Self {
        Self {
            client,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// `--rsh` value. rsync splits it on whitespace itself, so each part is quoted.
    fn rsh(&self) -> String {
        let mut parts = vec!["ssh".to_string()];
        parts.extend(self.client.connection_args());
        shell::quote_args(&parts)
    }

    pub fn build_args(&self, request: &SyncRequest) -> Vec<String> {
        let mut args = vec![RSYNC_FLAGS.to_string()];

        if self.dry_run {
            args.push("--dry-run".to_string());
        }

        for pattern in &request.exclude {
            args.push(format!("--exclude={}", pattern));
        }

        let source = with_trailing_slash(&request.local_dir);
        if self.client.is_local {
            args.push(source);
            args.push(request.remote_dir.clone());
        } else {
            args.push(format!("--rsh={}", self.rsh()));
            args.push(source);
            args.push(format!("{}:{}", self.client.destination(), request.remote_dir));
        }

        args
    }
}

impl FileSyncer for Rsync<'_> {
    fn sync(&self, request: &SyncRequest) -> Result<()> {
        let args = self.build_args(request);
        log_status!(
            "sync",
            "{} -> {}:{}",
            request.local_dir,
            self.client.host,
            request.remote_dir
        );

        match Command::new("rsync").args(&args).output() {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(self.failure(
                request,
                output.status.code().unwrap_or(-1),
                command::error_text(&output),
            )),
            Err(e) => Err(self.failure(request, -1, format!("Failed to run rsync: {}", e))),
        }
    }
}

impl Rsync<'_> {
    fn failure(&self, request: &SyncRequest, exit_code: i32, error: String) -> Error {
        Error::sync_failed(SyncFailedDetails {
            source: request.local_dir.clone(),
            destination: format!("{}:{}", self.client.host, request.remote_dir),
            exit_code,
            error,
        })
    }
}

fn with_trailing_slash(dir: &str) -> String {
    if dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{}/", dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(host: &str, port: u16) -> SshClient {
        SshClient {
            host: host.to_string(),
            user: Some("deploy".to_string()),
            port,
            identity_file: None,
            is_local: host == "localhost",
        }
    }

    fn request() -> SyncRequest {
        SyncRequest {
            local_dir: "/src/blog".to_string(),
            remote_dir: "/home/deploy/blog".to_string(),
            exclude: vec!["venv".to_string()],
        }
    }

    #[test]
    fn remote_sync_copies_contents_and_excludes_venv() {
        let c = client("dev.example.com", 22);
        let args = Rsync::new(&c).build_args(&request());

        assert_eq!(args[0], "-pthrvz");
        assert!(args.contains(&"--exclude=venv".to_string()));
        assert_eq!(args[args.len() - 2], "/src/blog/");
        assert_eq!(args[args.len() - 1], "deploy@dev.example.com:/home/deploy/blog");
    }

    #[test]
    fn rsh_carries_connection_options() {
        let c = client("dev.example.com", 2222);
        let args = Rsync::new(&c).build_args(&request());

        let rsh = args.iter().find(|a| a.starts_with("--rsh=")).unwrap();
        assert!(rsh.starts_with("--rsh=ssh -p 2222"));
        assert!(rsh.contains("BatchMode=yes"));
    }

    #[test]
    fn dry_run_flag_is_forwarded() {
        let c = client("dev.example.com", 22);
        let args = Rsync::new(&c).dry_run(true).build_args(&request());
        assert_eq!(args[1], "--dry-run");
    }

    #[test]
    fn missing_source_fails_with_sync_failed() {
        let dir = tempfile::tempdir().unwrap();
        let c = client("localhost", 22);
        let request = SyncRequest {
            local_dir: dir.path().join("missing").to_string_lossy().to_string(),
            remote_dir: dir.path().join("app").to_string_lossy().to_string(),
            exclude: vec!["venv".to_string()],
        };

        let err = Rsync::new(&c).sync(&request).unwrap_err();

        assert_eq!(err.code.as_str(), "sync.failed");
        assert_ne!(err.details["exitCode"], 0);
        assert_eq!(err.details["source"], request.local_dir.as_str());
        assert!(!err.details["error"].as_str().unwrap().is_empty());
    }

    #[test]
    fn local_sync_skips_ssh() {
        let c = client("localhost", 22);
        let args = Rsync::new(&c).build_args(&request());

        assert!(!args.iter().any(|a| a.starts_with("--rsh=")));
        assert_eq!(args[args.len() - 1], "/home/deploy/blog");
    }
}
