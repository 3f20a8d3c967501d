//! Subprocess execution and tool discovery.

pub mod command;
pub mod probe;

pub use command::{run, CommandSpec, ExecResult, ExecStatus};
pub use probe::{is_executable, resolve_tool, tool_exists};
