//! Tools the model can call, and the registry that dispatches them.
//!
//! Every tool describes itself with a [`ToolDefinition`] and executes JSON
//! arguments. Failures never escape the registry: they come back as a
//! failed [`ToolResult`], which the agent loop feeds to the model as a
//! tool message so it can try again.
//!
//! # Example
//!
//! ```no_run
//! use crewkit::config::ToolsConfig;
//! use crewkit::tools::ToolRegistry;
//! use serde_json::json;
//!
//! # async fn run() {
//! let registry = ToolRegistry::with_defaults(&ToolsConfig::default());
//! let result = registry.execute("list_files", json!({ "path": "." })).await;
//! println!("{}", result.to_message());
//! # }
//! ```

pub mod builtins;
pub mod registry;
pub mod validation;

pub use builtins::{EditFileTool, ListFilesTool, ReadFileTool, ShellTool, WriteFileTool};
pub use registry::{Tool, ToolRegistry, ToolResult};
pub use validation::{resolve_path, validate_command, validate_path, PathAccess};

pub use crate::provider::ToolDefinition;
