// Public modules
pub mod config;
pub mod error;
pub mod exec;
pub mod render;
pub mod ssh;
pub mod sync;
pub mod target;
pub mod tasks;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
