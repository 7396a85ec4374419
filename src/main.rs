use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "appdeploy")]
#[command(version = VERSION)]
#[command(about = "Provision and control a Python web app on one host over SSH")]
struct Cli {
    /// Config file (default: ./appdeploy.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Host to deploy to (overrides the config file)
    #[arg(long, global = true)]
    host: Option<String>,

    /// SSH login user (overrides the config file and ~/.ssh/config)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Log remote commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install packages, sync code, build the venv, wire up supervisor and nginx
    Install,
    /// Remove the application directory and its supervisor/nginx links
    Uninstall,
    /// Sync code, then restart the application
    Update,
    /// Start the application under supervisor
    Start,
    /// Stop the application under supervisor
    Stop,
    /// Restart the application under supervisor
    Restart,
    /// Generate nginx and supervisor configuration files
    #[command(visible_alias = "make_conf")]
    MakeConf,
    /// List available tasks
    List,
    /// Show the resolved deployment target and its paths
    Target,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        config: cli.config,
        host: cli.host,
        user: cli.user,
        dry_run: cli.dry_run,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
