use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::target::DeploymentTarget;

/// Project-local config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "appdeploy.json";

/// Contents of appdeploy.json. Every key is optional; missing keys fall back
/// to the built-in defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default)]
    pub identity_file: Option<String>,

    #[serde(default = "default_app_user")]
    pub app_user: String,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_app_port")]
    pub app_port: u16,

    #[serde(default = "default_wsgi_app")]
    pub wsgi_app: String,

    #[serde(default = "default_packages")]
    pub packages: Vec<String>,

    #[serde(default = "default_sync_exclude")]
    pub sync_exclude: Vec<String>,

    #[serde(default = "default_nginx_restart")]
    pub nginx_restart: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: None,
            port: default_ssh_port(),
            identity_file: None,
            app_user: default_app_user(),
            app_name: default_app_name(),
            app_port: default_app_port(),
            wsgi_app: default_wsgi_app(),
            packages: default_packages(),
            sync_exclude: default_sync_exclude(),
            nginx_restart: default_nginx_restart(),
        }
    }
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub user: Option<String>,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_ssh_port() -> u16 {
    22
}

fn default_app_user() -> String {
    "app_user".to_string()
}

fn default_app_name() -> String {
    "app_name".to_string()
}

fn default_app_port() -> u16 {
    8000
}

fn default_wsgi_app() -> String {
    "app:app".to_string()
}

fn default_packages() -> Vec<String> {
    ["python3", "python3-pip", "python3-virtualenv", "nginx", "supervisor", "git"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_sync_exclude() -> Vec<String> {
    vec!["venv".to_string()]
}

fn default_nginx_restart() -> Vec<String> {
    vec!["/etc/init.d/nginx".to_string(), "restart".to_string()]
}

impl DeployConfig {
    pub fn apply(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(user) = &overrides.user {
            self.user = Some(user.clone());
        }
        self
    }

    /// Freeze into a validated target rooted at `local_dir`.
    pub fn into_target(self, local_dir: PathBuf) -> Result<DeploymentTarget> {
        let identity_file = self
            .identity_file
            .filter(|path| !path.is_empty())
            .map(|path| shellexpand::tilde(&path).to_string());

        let target = DeploymentTarget {
            host: self.host.trim().to_string(),
            user: self.user.filter(|u| !u.is_empty()),
            port: self.port,
            identity_file,
            app_user: self.app_user,
            app_name: self.app_name,
            local_dir,
            app_port: self.app_port,
            wsgi_app: self.wsgi_app,
            packages: self.packages,
            sync_exclude: self.sync_exclude,
            nginx_restart: self.nginx_restart,
        };

        target.validate()?;
        Ok(target)
    }
}

// =============================================================================
// Loading functions
// =============================================================================

/// Resolve which config file to read.
///
/// An explicit path must exist. The implicit `./appdeploy.json` may be absent,
/// in which case the built-in defaults apply.
pub fn resolve_path(explicit: Option<&Path>, cwd: &Path) -> (PathBuf, bool) {
    match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (cwd.join(CONFIG_FILE), false),
    }
}

pub fn load_config(path: &Path, required: bool) -> Result<DeployConfig> {
    if !path.exists() {
        if required {
            return Err(Error::internal_io(
                format!("Config file not found: {}", path.display()),
                Some("read config".to_string()),
            ));
        }
        return Ok(DeployConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
}

/// Load config, apply CLI overrides, and build the target.
///
/// The local project directory is the directory holding the config file.
pub fn load_target(
    explicit: Option<&Path>,
    cwd: &Path,
    overrides: &ConfigOverrides,
) -> Result<DeploymentTarget> {
    let (path, required) = resolve_path(explicit, cwd);
    let config = load_config(&path, required)?.apply(overrides);

    let local_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => cwd.to_path_buf(),
    };

    config.into_target(local_dir)
}
