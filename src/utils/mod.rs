//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Process output inspection
//! - `io` - File I/O with consistent error handling
//! - `shell` - Shell escaping and quoting
//! - `template` - String template rendering

pub mod command;
pub mod io;
pub mod shell;
pub mod template;
