use std::path::PathBuf;

use appdeploy::config::{self, ConfigOverrides};
use appdeploy::target::DeploymentTarget;
use appdeploy::tasks::Task;

pub type CmdResult<T> = appdeploy::Result<(T, i32)>;

pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub dry_run: bool,
}

impl GlobalArgs {
    /// Resolve the deployment target from the config file and global flags.
    pub fn load_target(&self) -> appdeploy::Result<DeploymentTarget> {
        let cwd = std::env::current_dir().map_err(|e| {
            appdeploy::Error::internal_io(e.to_string(), Some("read working directory".to_string()))
        })?;

        let overrides = ConfigOverrides {
            host: self.host.clone(),
            user: self.user.clone(),
        };

        config::load_target(self.config.as_deref(), &cwd, &overrides)
    }
}

pub mod list;
pub mod make_conf;
pub mod target;
pub mod task;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($module:ident) => {
        crate::output::map_cmd_result_to_json($module::run())
    };
    ($module:ident, $global:expr) => {
        crate::output::map_cmd_result_to_json($module::run($global))
    };
    ($module:ident, $args:expr, $global:expr) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (appdeploy::Result<serde_json::Value>, i32) {
    crate::tty::status("appdeploy is working...");

    match command {
        // Local commands
        crate::Commands::List => dispatch!(list),
        crate::Commands::Target => dispatch!(target, global),
        crate::Commands::MakeConf => dispatch!(make_conf, global),

        // Remote tasks
        crate::Commands::Install => dispatch!(task, Task::Install, global),
        crate::Commands::Uninstall => dispatch!(task, Task::Uninstall, global),
        crate::Commands::Update => dispatch!(task, Task::Update, global),
        crate::Commands::Start => dispatch!(task, Task::Start, global),
        crate::Commands::Stop => dispatch!(task, Task::Stop, global),
        crate::Commands::Restart => dispatch!(task, Task::Restart, global),
    }
}
