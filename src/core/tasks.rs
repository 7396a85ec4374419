//! Named deployment tasks and the steps they are built from.
//!
//! Every task is a straight-line sequence. The first failing step aborts the
//! task and nothing already done is undone. The only decisions taken on remote
//! state are existence checks.

use serde::Serialize;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::exec::{RemoteCommand, RemoteExecutor, RemoteFilesystem};
use crate::render;
use crate::ssh::CommandOutput;
use crate::sync::{FileSyncer, SyncRequest};
use crate::target::{DeploymentTarget, VENV_DIR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Install,
    Uninstall,
    Update,
    Start,
    Stop,
    Restart,
    MakeConf,
}

impl Task {
    pub fn all() -> &'static [Task] {
        &[
            Task::Install,
            Task::Uninstall,
            Task::Update,
            Task::Start,
            Task::Stop,
            Task::Restart,
            Task::MakeConf,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::Install => "install",
            Task::Uninstall => "uninstall",
            Task::Update => "update",
            Task::Start => "start",
            Task::Stop => "stop",
            Task::Restart => "restart",
            Task::MakeConf => "make_conf",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Task::Install => "Install packages, sync code, build the venv, wire up supervisor and nginx",
            Task::Uninstall => "Remove the application directory and its supervisor/nginx links",
            Task::Update => "Sync code, then restart the application",
            Task::Start => "Start the application under supervisor",
            Task::Stop => "Stop the application under supervisor",
            Task::Restart => "Restart the application under supervisor",
            Task::MakeConf => "Generate nginx and supervisor configuration files",
        }
    }

    /// Whether the task talks to the host at all.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Task::MakeConf)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub name: String,
    pub description: String,
    pub remote: bool,
}

pub fn list() -> Vec<TaskInfo> {
    Task::all()
        .iter()
        .map(|task| TaskInfo {
            name: task.name().to_string(),
            description: task.description().to_string(),
            remote: task.is_remote(),
        })
        .collect()
}

/// One completed step of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Run { command: String },
    Sync { source: String, destination: String },
    Skip { reason: String },
    Render { path: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub task: Task,
    pub host: String,
    pub app_dir: String,
    pub dry_run: bool,
    pub started_at: String,
    pub elapsed_ms: u64,
    pub steps: Vec<Step>,
}

/// Runs tasks against one target through injected capabilities.
pub struct Deployer<'a> {
    target: &'a DeploymentTarget,
    executor: &'a dyn RemoteExecutor,
    filesystem: &'a dyn RemoteFilesystem,
    syncer: &'a dyn FileSyncer,
    steps: Vec<Step>,
}

impl<'a> Deployer<'a> {
    pub fn new(
        target: &'a DeploymentTarget,
        executor: &'a dyn RemoteExecutor,
        filesystem: &'a dyn RemoteFilesystem,
        syncer: &'a dyn FileSyncer,
    ) -> Self {
        Self {
            target,
            executor,
            filesystem,
            syncer,
            steps: Vec::new(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn run_task(&mut self, task: Task) -> Result<()> {
        match task {
            Task::Install => self.install(),
            Task::Uninstall => self.uninstall(),
            Task::Update => self.update(),
            Task::Start => self.start(),
            Task::Stop => self.stop(),
            Task::Restart => self.restart(),
            Task::MakeConf => self.make_conf(),
        }
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub fn install(&mut self) -> Result<()> {
        self.require_rendered_configs()?;
        self.install_requirements()?;
        self.sync_code()?;
        self.update_venv()?;
        self.configure_supervisor()?;
        self.configure_nginx()
    }

    pub fn uninstall(&mut self) -> Result<()> {
        let app_dir = self.target.app_dir();
        if self.filesystem.exists(&app_dir)? {
            self.run(RemoteCommand::new("rm").args(["-rf", app_dir.as_str()]))?;
        } else {
            self.skip(format!("{} does not exist", app_dir));
        }

        let nginx_conf = self.target.system_nginx_conf();
        if self.filesystem.exists(&nginx_conf)? {
            self.run(RemoteCommand::new("rm").arg(nginx_conf).sudo())?;
        } else {
            self.skip(format!("{} does not exist", nginx_conf));
        }

        let supervisor_conf = self.target.system_supervisor_conf();
        if self.filesystem.exists(&supervisor_conf)? {
            self.run(RemoteCommand::new("rm").arg(supervisor_conf).sudo())?;
        } else {
            self.skip(format!("{} does not exist", supervisor_conf));
        }

        Ok(())
    }

    /// Sync first; restart only once the new code is in place.
    pub fn update(&mut self) -> Result<()> {
        self.sync_code()?;
        self.restart()
    }

    pub fn start(&mut self) -> Result<()> {
        self.supervisorctl_program("start")
    }

    pub fn stop(&mut self) -> Result<()> {
        self.supervisorctl_program("stop")
    }

    pub fn restart(&mut self) -> Result<()> {
        self.supervisorctl_program("restart")
    }

    pub fn make_conf(&mut self) -> Result<()> {
        let result = render::make_conf(self.target)?;
        self.steps.push(Step::Render {
            path: result.supervisor_conf,
        });
        self.steps.push(Step::Render {
            path: result.nginx_conf,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------

    pub fn install_requirements(&mut self) -> Result<()> {
        let target = self.target;
        for package in &target.packages {
            log_status!("install", "Installing {}", package);
            self.run(
                RemoteCommand::new("apt-get")
                    .args(["install", "-y", package.as_str()])
                    .sudo(),
            )?;
        }
        Ok(())
    }

    pub fn sync_code(&mut self) -> Result<()> {
        let app_dir = self.target.app_dir();
        if self.filesystem.exists(&app_dir)? {
            self.skip(format!("{} already exists", app_dir));
        } else {
            self.run(RemoteCommand::new("mkdir").args(["-p", app_dir.as_str()]))?;
        }

        let request = SyncRequest {
            local_dir: self.target.local_dir.to_string_lossy().to_string(),
            remote_dir: app_dir,
            exclude: self.target.sync_exclude.clone(),
        };
        self.syncer.sync(&request)?;

        self.steps.push(Step::Sync {
            source: request.local_dir,
            destination: format!("{}:{}", self.target.host, request.remote_dir),
        });
        Ok(())
    }

    pub fn update_venv(&mut self) -> Result<()> {
        let app_dir = self.target.app_dir();

        if self.filesystem.exists(&self.target.venv_dir())? {
            self.skip(format!("{} already exists", self.target.venv_dir()));
        } else {
            let prompt = format!("--prompt=({})", self.target.app_name);
            self.run(
                RemoteCommand::new("virtualenv")
                    .args([VENV_DIR, prompt.as_str()])
                    .in_dir(app_dir.as_str()),
            )?;
        }

        self.run(
            RemoteCommand::new(format!("{}/bin/pip", VENV_DIR))
                .args(["install", "-r", "requirements.txt"])
                .in_dir(app_dir),
        )?;
        Ok(())
    }

    pub fn configure_supervisor(&mut self) -> Result<()> {
        let source = self.target.remote_supervisor_conf();
        let link = self.target.system_supervisor_conf();
        self.run(RemoteCommand::new("ln").args(["-sf", source.as_str(), link.as_str()]).sudo())?;
        self.supervisorctl(&["reread"])?;
        self.supervisorctl(&["update"])
    }

    pub fn configure_nginx(&mut self) -> Result<()> {
        let source = self.target.remote_nginx_conf();
        let link = self.target.system_nginx_conf();
        self.run(RemoteCommand::new("ln").args(["-sf", source.as_str(), link.as_str()]).sudo())?;
        self.run(RemoteCommand::from_argv(&self.target.nginx_restart).sudo())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn supervisorctl_program(&mut self, action: &str) -> Result<()> {
        let app_name = self.target.app_name.clone();
        self.supervisorctl(&[action, app_name.as_str()])
    }

    fn supervisorctl(&mut self, args: &[&str]) -> Result<()> {
        self.run(RemoteCommand::new("supervisorctl").args(args.iter().copied()).sudo())?;
        Ok(())
    }

    fn run(&mut self, command: RemoteCommand) -> Result<CommandOutput> {
        log_status!("run", "{}", command);
        let output = self.executor.run(&command)?;
        self.steps.push(Step::Run {
            command: command.to_shell(),
        });
        Ok(output)
    }

    fn skip(&mut self, reason: String) {
        log_status!("skip", "{}", reason);
        self.steps.push(Step::Skip { reason });
    }

    /// The links created by install point at the synced `etc/` files, so they
    /// must be rendered before anything touches the host.
    fn require_rendered_configs(&self) -> Result<()> {
        let missing: Vec<String> = [
            self.target.local_nginx_conf(),
            self.target.local_supervisor_conf(),
        ]
        .iter()
        .filter(|path| !path.is_file())
        .map(|path| path.to_string_lossy().to_string())
        .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(Error::validation_invalid_argument(
            "etc",
            format!("Rendered config files are missing: {}", missing.join(", ")),
        )
        .with_hint("Run 'appdeploy make-conf' first"))
    }
}

/// Run one task end to end and describe what it did.
pub fn run(
    task: Task,
    target: &DeploymentTarget,
    executor: &dyn RemoteExecutor,
    filesystem: &dyn RemoteFilesystem,
    syncer: &dyn FileSyncer,
    dry_run: bool,
) -> Result<TaskReport> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let clock = Instant::now();

    log_status!("task", "{} on {}", task.name(), target.host);
    let mut deployer = Deployer::new(target, executor, filesystem, syncer);
    if let Err(err) = deployer.run_task(task) {
        return Err(with_completed_steps(err, deployer.steps()));
    }

    Ok(TaskReport {
        task,
        host: target.host.clone(),
        app_dir: target.app_dir(),
        dry_run,
        started_at,
        elapsed_ms: clock.elapsed().as_millis() as u64,
        steps: deployer.into_steps(),
    })
}

/// Record what already ran before the failing step, since nothing is undone.
fn with_completed_steps(mut err: Error, steps: &[Step]) -> Error {
    if let serde_json::Value::Object(details) = &mut err.details {
        details.insert(
            "completedSteps".to_string(),
            serde_json::to_value(steps).unwrap_or_default(),
        );
    }
    err
}
