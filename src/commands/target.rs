use serde::Serialize;

use appdeploy::target::{DeploymentTarget, TargetPaths};

use super::{CmdResult, GlobalArgs};

#[derive(Serialize)]
pub struct TargetOutput {
    pub command: String,
    pub target: DeploymentTarget,
    pub paths: TargetPaths,
}

/// Show what a task would act on. Never contacts the host.
pub fn run(global: &GlobalArgs) -> CmdResult<TargetOutput> {
    let target = global.load_target()?;
    let paths = target.paths();

    Ok((
        TargetOutput {
            command: "target.show".to_string(),
            target,
            paths,
        },
        0,
    ))
}
