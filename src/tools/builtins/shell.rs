use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

use crate::config::ToolsConfig;
use crate::error::{CrewError, CrewResult};
use crate::executor::CommandExecutor;
use crate::provider::ToolDefinition;
use crate::tools::registry::Tool;
use crate::tools::validation::{resolve_path, validate_command};

use super::{base_dir, parse_args};

const NAME: &str = "shell";

#[derive(Debug, Deserialize)]
struct ShellArgs {
    command: String,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default, alias = "timeout_seconds")]
    timeout: Option<u64>,
}

/// Runs a shell command in the working directory.
pub struct ShellTool {
    definition: ToolDefinition,
    executor: CommandExecutor,
}

impl ShellTool {
    /// Shell tool using the configured working directory, timeout and
    /// output cap.
    pub fn from_config(config: &ToolsConfig) -> Self {
        let base = base_dir(config);
        let executor = CommandExecutor::new(config.shell_timeout_seconds, base.as_deref(), true)
            .with_max_output_bytes(config.max_output_bytes);
        Self::with_executor(executor)
    }

    /// Shell tool around an existing executor.
    pub fn with_executor(executor: CommandExecutor) -> Self {
        let definition = ToolDefinition::new(
            NAME,
            "Execute a shell command and return its output",
            json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The command to run"
                    },
                    "cwd": {
                        "type": "string",
                        "description": "Working directory (optional, defaults to the project directory)"
                    },
                    "timeout": {
                        "type": "number",
                        "description": "Timeout in seconds (optional, at most the configured limit)"
                    }
                },
                "required": ["command"]
            }),
        );
        Self { definition, executor }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: Value) -> CrewResult<String> {
        let args: ShellArgs = parse_args(NAME, args)?;
        validate_command(&args.command)?;

        let mut executor = self.executor.clone();
        if let Some(cwd) = args.cwd.as_deref() {
            let dir = resolve_path(Some(self.executor.working_dir()), cwd);
            executor
                .set_working_dir(Path::new(&dir))
                .map_err(|e| CrewError::tool(NAME, e.to_string()))?;
        }

        // The model may shorten the configured timeout, never extend it.
        let limit = self.executor.timeout_seconds();
        let timeout = args.timeout.filter(|secs| *secs > 0).map(|secs| secs.min(limit));

        let result = executor
            .execute_command(&args.command, timeout)
            .await
            .map_err(|e| CrewError::tool(NAME, e.to_string()))?;

        let mut output = result.stdout;
        if !result.stderr.is_empty() {
            output.push_str("\nStderr: ");
            output.push_str(&result.stderr);
        }
        if result.truncated {
            output.push_str("\n... [output truncated]");
        }

        if result.success {
            Ok(output)
        } else {
            Err(CrewError::tool(
                NAME,
                format!("Command failed with exit code {}\n{}", result.return_code, output),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_in(dir: &Path) -> ShellTool {
        ShellTool::from_config(&ToolsConfig {
            working_dir: Some(dir.display().to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("here.txt"), "x").unwrap();

        let output = tool_in(dir.path())
            .execute(json!({"command": "ls"}))
            .await
            .unwrap();
        assert!(output.contains("here.txt"));
    }

    #[tokio::test]
    async fn test_stderr_appended() {
        let dir = tempfile::tempdir().unwrap();
        let output = tool_in(dir.path())
            .execute(json!({"command": "echo out; echo warn >&2"}))
            .await
            .unwrap();
        assert_eq!(output, "out\n\nStderr: warn\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = tool_in(dir.path())
            .execute(json!({"command": "exit 2"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exit code 2"));
    }

    #[tokio::test]
    async fn test_timeout_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = tool_in(dir.path())
            .execute(json!({"command": "sleep 20", "timeout": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Command timed out after 1 seconds");
    }

    #[tokio::test]
    async fn test_requested_timeout_capped_by_config() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ShellTool::from_config(&ToolsConfig {
            working_dir: Some(dir.path().display().to_string()),
            shell_timeout_seconds: 1,
            ..Default::default()
        });
        let err = tool
            .execute(json!({"command": "sleep 20", "timeout": 86400}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Command timed out after 1 seconds");
    }

    #[tokio::test]
    async fn test_dangerous_command_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = tool_in(dir.path())
            .execute(json!({"command": "rm -rf /"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_command_argument() {
        let dir = tempfile::tempdir().unwrap();
        let err = tool_in(dir.path()).execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("Invalid arguments for shell"));
    }
}
