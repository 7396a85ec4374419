//! nginx and supervisor config files generated from the deployment target.

use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::target::DeploymentTarget;
use crate::utils::io;
use crate::utils::template::{render, TemplateVars};

const NGINX_TEMPLATE: &str = "
server {
    location / {
        proxy_pass http://127.0.0.1:{{appPort}};
    }
    location /static {
        alias {{appDir}}/static/;
    }
}
";

const SUPERVISOR_TEMPLATE: &str = "
[program:{{appName}}]
command = {{appDir}}/venv/bin/gunicorn {{wsgiApp}} -b localhost:{{appPort}}
directory = {{appDir}}
user = {{appUser}}
";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeConfResult {
    pub etc_dir: String,
    pub nginx_conf: String,
    pub supervisor_conf: String,
}

fn render_vars(target: &DeploymentTarget, template: &str) -> String {
    let app_dir = target.app_dir();
    let app_port = target.app_port.to_string();

    render(
        template,
        &[
            (TemplateVars::APP_USER, target.app_user.as_str()),
            (TemplateVars::APP_NAME, target.app_name.as_str()),
            (TemplateVars::APP_DIR, app_dir.as_str()),
            (TemplateVars::APP_PORT, app_port.as_str()),
            (TemplateVars::WSGI_APP, target.wsgi_app.as_str()),
        ],
    )
}

pub fn render_nginx_conf(target: &DeploymentTarget) -> String {
    render_vars(target, NGINX_TEMPLATE)
}

pub fn render_supervisor_conf(target: &DeploymentTarget) -> String {
    render_vars(target, SUPERVISOR_TEMPLATE)
}

/// Write both configs into `<local_dir>/etc`, creating it if needed.
///
/// Output depends only on the target, so repeated runs produce identical files.
pub fn make_conf(target: &DeploymentTarget) -> Result<MakeConfResult> {
    let etc_dir = target.local_etc_dir();
    io::ensure_dir(&etc_dir, "create etc directory")?;

    let supervisor_path = target.local_supervisor_conf();
    io::write_file_atomic(
        &supervisor_path,
        &render_supervisor_conf(target),
        "write supervisor config",
    )?;

    let nginx_path = target.local_nginx_conf();
    io::write_file_atomic(&nginx_path, &render_nginx_conf(target), "write nginx config")?;

    log_status!("make_conf", "Wrote {} and {}", display(&nginx_path), display(&supervisor_path));

    Ok(MakeConfResult {
        etc_dir: display(&etc_dir),
        nginx_conf: display(&nginx_path),
        supervisor_conf: display(&supervisor_path),
    })
}

fn display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
