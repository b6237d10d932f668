use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::config::ToolsConfig;
use crate::error::{CrewError, CrewResult};
use crate::provider::ToolDefinition;
use crate::tools::registry::Tool;
use crate::tools::validation::{resolve_path, validate_path, PathAccess};

use super::{base_dir, parse_args};

const NAME: &str = "read_file";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadArgs {
    path: String,
    #[serde(default, alias = "start_line")]
    start_line: Option<usize>,
    #[serde(default, alias = "end_line")]
    end_line: Option<usize>,
}

/// Returns a file's content, or a 1-indexed inclusive line range of it.
pub struct ReadFileTool {
    definition: ToolDefinition,
    base_dir: Option<PathBuf>,
}

impl ReadFileTool {
    /// Tool resolving relative paths against the configured working directory.
    pub fn from_config(config: &ToolsConfig) -> Self {
        let definition = ToolDefinition::new(
            NAME,
            "Read the contents of a file.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The file path to read"
                    },
                    "startLine": {
                        "type": "number",
                        "description": "Starting line number (1-indexed, optional)"
                    },
                    "endLine": {
                        "type": "number",
                        "description": "Ending line number (1-indexed, inclusive, optional)"
                    }
                },
                "required": ["path"]
            }),
        );
        Self {
            definition,
            base_dir: base_dir(config),
        }
    }
}

fn select_lines(content: &str, start: Option<usize>, end: Option<usize>) -> String {
    if start.is_none() && end.is_none() {
        return content.to_string();
    }
    let lines: Vec<&str> = content.split('\n').collect();
    let from = start.unwrap_or(1).max(1) - 1;
    let to = end.unwrap_or(lines.len()).min(lines.len());
    if from >= to {
        return String::new();
    }
    lines[from..to].join("\n")
}

#[async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: Value) -> CrewResult<String> {
        let args: ReadArgs = parse_args(NAME, args)?;
        validate_path(&args.path, PathAccess::Read)?;

        let target = resolve_path(self.base_dir.as_deref(), &args.path);
        let content = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| CrewError::file_system(target.display().to_string(), e.to_string()))?;

        Ok(select_lines(&content, args.start_line, args.end_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_ranges() {
        let text = "one\ntwo\nthree\nfour";
        assert_eq!(select_lines(text, None, None), text);
        assert_eq!(select_lines(text, Some(2), Some(3)), "two\nthree");
        assert_eq!(select_lines(text, Some(3), None), "three\nfour");
        assert_eq!(select_lines(text, None, Some(1)), "one");
        assert_eq!(select_lines(text, Some(9), None), "");
        assert_eq!(select_lines(text, Some(2), Some(99)), "two\nthree\nfour");
    }

    #[tokio::test]
    async fn test_missing_file_is_file_system_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::from_config(&ToolsConfig {
            working_dir: Some(dir.path().display().to_string()),
            ..Default::default()
        });
        let err = tool.execute(json!({"path": "absent.txt"})).await.unwrap_err();
        assert_eq!(err.code(), "FILE_SYSTEM_ERROR");
    }

    #[tokio::test]
    async fn test_reads_range_with_camel_case_args() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "l1\nl2\nl3\n").unwrap();
        let tool = ReadFileTool::from_config(&ToolsConfig {
            working_dir: Some(dir.path().display().to_string()),
            ..Default::default()
        });

        let output = tool
            .execute(json!({"path": "a.txt", "startLine": 2, "endLine": 2}))
            .await
            .unwrap();
        assert_eq!(output, "l2");
    }
}
