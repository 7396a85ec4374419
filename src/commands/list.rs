use serde::Serialize;

use appdeploy::tasks::{self, TaskInfo};

use super::CmdResult;

#[derive(Serialize)]
pub struct ListOutput {
    pub command: String,
    pub tasks: Vec<TaskInfo>,
}

pub fn run() -> CmdResult<ListOutput> {
    Ok((
        ListOutput {
            command: "tasks.list".to_string(),
            tasks: tasks::list(),
        },
        0,
    ))
}
