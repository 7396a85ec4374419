use appdeploy::exec::DryRun;
use appdeploy::ssh::SshClient;
use appdeploy::sync::Rsync;
use appdeploy::tasks::{self, Task, TaskReport};

use super::{CmdResult, GlobalArgs};

/// Run a remote task against the configured host.
///
/// With `--dry-run`, commands are logged instead of executed and rsync only
/// reports what it would transfer.
pub fn run(task: Task, global: &GlobalArgs) -> CmdResult<TaskReport> {
    let target = global.load_target()?;
    let client = SshClient::from_target(&target)?;
    let rsync = Rsync::new(&client).dry_run(global.dry_run);

    let report = if global.dry_run {
        let dry_run = DryRun::new(&client);
        tasks::run(task, &target, &dry_run, &dry_run, &rsync, true)?
    } else {
        tasks::run(task, &target, &client, &client, &rsync, false)?
    };

    Ok((report, 0))
}
