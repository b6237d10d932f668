//! Built-in tools: shell execution and file operations.

mod edit_file;
mod list_files;
mod read_file;
mod shell;
mod write_file;

pub use edit_file::EditFileTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use shell::ShellTool;
pub use write_file::WriteFileTool;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::ToolsConfig;
use crate::error::{CrewError, CrewResult};

/// Decode tool arguments into the tool's input struct.
fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> CrewResult<T> {
    serde_json::from_value(args)
        .map_err(|e| CrewError::tool(tool, format!("Invalid arguments for {}: {}", tool, e)))
}

fn base_dir(config: &ToolsConfig) -> Option<PathBuf> {
    config.working_dir.as_ref().map(PathBuf::from)
}
