//! The fixed host/user/path triple a deployment is aimed at.
//!
//! A `DeploymentTarget` is built once per process from configuration and
//! handed to every task by reference. All remote paths are derived from
//! `app_user` and `app_name`, so they can never disagree with each other.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const SUPERVISOR_CONF_DIR: &str = "/etc/supervisor/conf.d";
const NGINX_SITES_DIR: &str = "/etc/nginx/sites-enabled";

pub const LOCAL_ETC_DIR: &str = "etc";
pub const NGINX_CONF_FILE: &str = "nginx.conf";
pub const SUPERVISOR_CONF_FILE: &str = "supervisor.conf";
pub const VENV_DIR: &str = "venv";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentTarget {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
    pub app_user: String,
    pub app_name: String,
    pub local_dir: PathBuf,
    pub app_port: u16,
    pub wsgi_app: String,
    pub packages: Vec<String>,
    pub sync_exclude: Vec<String>,
    pub nginx_restart: Vec<String>,
}

/// Every path derived from a target, for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPaths {
    pub app_dir: String,
    pub venv_dir: String,
    pub system_nginx_conf: String,
    pub system_supervisor_conf: String,
    pub remote_nginx_conf: String,
    pub remote_supervisor_conf: String,
    pub local_nginx_conf: String,
    pub local_supervisor_conf: String,
}

impl DeploymentTarget {
    /// Check the fields every derived path depends on.
    ///
    /// The host may be empty here; only tasks that connect need it.
    pub fn validate(&self) -> Result<()> {
        validate_host(&self.host)?;
        validate_path_segment("appUser", &self.app_user)?;
        validate_path_segment("appName", &self.app_name)?;

        if self.port == 0 {
            return Err(Error::config_invalid_value(
                "port",
                Some("0".to_string()),
                "SSH port must be between 1 and 65535",
            ));
        }

        if self.app_port == 0 {
            return Err(Error::config_invalid_value(
                "appPort",
                Some("0".to_string()),
                "Application port must be between 1 and 65535",
            ));
        }

        if self.nginx_restart.is_empty() {
            return Err(Error::config_invalid_value(
                "nginxRestart",
                None,
                "Restart command must have at least a program name",
            ));
        }

        Ok(())
    }

    /// `/home/<app_user>/<app_name>`
    pub fn app_dir(&self) -> String {
        format!("/home/{}/{}", self.app_user, self.app_name)
    }

    pub fn venv_dir(&self) -> String {
        format!("{}/{}", self.app_dir(), VENV_DIR)
    }

    pub fn system_supervisor_conf(&self) -> String {
        format!("{}/{}.conf", SUPERVISOR_CONF_DIR, self.app_name)
    }

    pub fn system_nginx_conf(&self) -> String {
        format!("{}/{}", NGINX_SITES_DIR, self.app_name)
    }

    /// Synced copy of the rendered nginx config on the host.
    pub fn remote_nginx_conf(&self) -> String {
        format!("{}/{}/{}", self.app_dir(), LOCAL_ETC_DIR, NGINX_CONF_FILE)
    }

    /// Synced copy of the rendered supervisor config on the host.
    pub fn remote_supervisor_conf(&self) -> String {
        format!("{}/{}/{}", self.app_dir(), LOCAL_ETC_DIR, SUPERVISOR_CONF_FILE)
    }

    pub fn local_etc_dir(&self) -> PathBuf {
        self.local_dir.join(LOCAL_ETC_DIR)
    }

    pub fn local_nginx_conf(&self) -> PathBuf {
        self.local_etc_dir().join(NGINX_CONF_FILE)
    }

    pub fn local_supervisor_conf(&self) -> PathBuf {
        self.local_etc_dir().join(SUPERVISOR_CONF_FILE)
    }

    pub fn paths(&self) -> TargetPaths {
        TargetPaths {
            app_dir: self.app_dir(),
            venv_dir: self.venv_dir(),
            system_nginx_conf: self.system_nginx_conf(),
            system_supervisor_conf: self.system_supervisor_conf(),
            remote_nginx_conf: self.remote_nginx_conf(),
            remote_supervisor_conf: self.remote_supervisor_conf(),
            local_nginx_conf: display_path(&self.local_nginx_conf()),
            local_supervisor_conf: display_path(&self.local_supervisor_conf()),
        }
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// A host is handed to ssh and rsync as a bare argument, so it must not be
/// mistaken for an option.
fn validate_host(host: &str) -> Result<()> {
    let problem = if host.starts_with('-') {
        Some("must not start with '-'")
    } else if host.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else {
        None
    };

    match problem {
        Some(problem) => Err(Error::config_invalid_value(
            "host",
            Some(host.to_string()),
            problem,
        )),
        None => Ok(()),
    }
}

fn validate_path_segment(key: &str, value: &str) -> Result<()> {
    let problem = if value.is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be a relative path component")
    } else if value.contains('/') {
        Some("must not contain '/'")
    } else if value.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else {
        None
    };

    match problem {
        Some(problem) => Err(Error::config_invalid_value(
            key,
            Some(value.to_string()),
            problem,
        )),
        None => Ok(()),
    }
}
