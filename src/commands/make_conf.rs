use serde::Serialize;

use appdeploy::render::{self, MakeConfResult};

use super::{CmdResult, GlobalArgs};

#[derive(Serialize)]
pub struct MakeConfOutput {
    pub command: String,
    #[serde(flatten)]
    pub result: MakeConfResult,
}

/// Render configs into the local `etc/` directory. Never contacts the host.
pub fn run(global: &GlobalArgs) -> CmdResult<MakeConfOutput> {
    let target = global.load_target()?;
    let result = render::make_conf(&target)?;

    Ok((
        MakeConfOutput {
            command: "make_conf".to_string(),
            result,
        },
        0,
    ))
}
