mod client;

pub use client::{CommandOutput, SshClient};
