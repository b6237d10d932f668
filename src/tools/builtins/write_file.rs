use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::debug;

use crate::config::ToolsConfig;
use crate::error::{CrewError, CrewResult};
use crate::provider::ToolDefinition;
use crate::tools::registry::Tool;
use crate::tools::validation::{resolve_path, validate_path, PathAccess};

use super::{base_dir, parse_args};

const NAME: &str = "write_file";

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

/// Creates or overwrites a file, creating parent directories.
pub struct WriteFileTool {
    definition: ToolDefinition,
    base_dir: Option<PathBuf>,
}

impl WriteFileTool {
    /// Tool resolving relative paths against the configured working directory.
    pub fn from_config(config: &ToolsConfig) -> Self {
        let definition = ToolDefinition::new(
            NAME,
            "Create or overwrite a file with the given content. Creates parent directories if needed.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The file path to write to (relative or absolute)"
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to write to the file"
                    }
                },
                "required": ["path", "content"]
            }),
        );
        Self {
            definition,
            base_dir: base_dir(config),
        }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: Value) -> CrewResult<String> {
        let args: WriteArgs = parse_args(NAME, args)?;
        validate_path(&args.path, PathAccess::Write)?;

        let target = resolve_path(self.base_dir.as_deref(), &args.path);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CrewError::file_system(parent.display().to_string(), e.to_string()))?;
        }
        tokio::fs::write(&target, args.content.as_bytes())
            .await
            .map_err(|e| CrewError::file_system(target.display().to_string(), e.to_string()))?;

        debug!(path = %target.display(), bytes = args.content.len(), "File written");
        Ok(format!("File written successfully: {}", args.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::from_config(&ToolsConfig {
            working_dir: Some(dir.path().display().to_string()),
            ..Default::default()
        });

        let output = tool
            .execute(json!({"path": "nested/deep/out.txt", "content": "one"}))
            .await
            .unwrap();
        assert_eq!(output, "File written successfully: nested/deep/out.txt");

        tool.execute(json!({"path": "nested/deep/out.txt", "content": "two"}))
            .await
            .unwrap();
        let written = std::fs::read_to_string(dir.path().join("nested/deep/out.txt")).unwrap();
        assert_eq!(written, "two");
    }

    #[tokio::test]
    async fn test_denylisted_path_rejected() {
        let tool = WriteFileTool::from_config(&ToolsConfig::default());
        let err = tool
            .execute(json!({"path": "/etc/crewkit.conf", "content": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
