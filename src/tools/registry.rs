//! Tool trait, uniform results and the name-keyed registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::error::CrewResult;
use crate::provider::{ToolCall, ToolDefinition};
use crate::tools::builtins::{EditFileTool, ListFilesTool, ReadFileTool, ShellTool, WriteFileTool};

/// Outcome of one tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Output on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Content of the tool message fed back to the model.
    pub fn to_message(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_default()
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("Unknown error"))
        }
    }
}

/// Trait for tool implementations
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema.
    fn definition(&self) -> &ToolDefinition;

    /// Execute with decoded JSON arguments, returning the output text.
    async fn execute(&self, args: Value) -> CrewResult<String>;

    /// Tool name.
    fn name(&self) -> &str {
        &self.definition().name
    }
}

/// Registry for managing tools.
///
/// Lookup is by name; iteration, and therefore the manifest handed to the
/// model, follows registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five built-in tools configured from `config`.
    pub fn with_defaults(config: &ToolsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ShellTool::from_config(config)));
        registry.register(Arc::new(WriteFileTool::from_config(config)));
        registry.register(Arc::new(EditFileTool::from_config(config)));
        registry.register(Arc::new(ReadFileTool::from_config(config)));
        registry.register(Arc::new(ListFilesTool::from_config(config)));
        registry
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!(tool = %name, "Registering tool");
        match self.index.get(&name) {
            Some(&slot) => self.tools[slot] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| Arc::clone(&self.tools[slot]))
    }

    /// All tools in registration order.
    pub fn all(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions to hand to the model as its tool manifest.
    pub fn to_manifest(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition().clone()).collect()
    }

    /// Execute a tool by name. Never fails: unknown names and tool errors
    /// come back as failed results.
    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return ToolResult::failure(format!("Unknown tool: {}", name));
        };

        match tool.execute(args).await {
            Ok(output) => {
                debug!(tool = %name, bytes = output.len(), "Tool succeeded");
                ToolResult::success(output)
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool failed");
                ToolResult::failure(e.to_string())
            }
        }
    }

    /// Execute a model-issued call, decoding its argument string first.
    pub async fn execute_call(&self, call: &ToolCall) -> ToolResult {
        match call.parse_arguments() {
            Ok(args) => self.execute(call.name(), args).await,
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrewError;
    use serde_json::json;

    struct EchoTool {
        definition: ToolDefinition,
    }

    impl EchoTool {
        fn new(name: &str) -> Self {
            Self {
                definition: ToolDefinition::new(name, "Echo the text argument", json!({"type": "object"})),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(&self, args: Value) -> CrewResult<String> {
            args.get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| CrewError::tool(self.name(), "Missing 'text' parameter"))
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.execute("not_a_tool", json!({})).await;
        assert_eq!(result, ToolResult::failure("Unknown tool: not_a_tool"));
        assert_eq!(result.to_message(), "Error: Unknown tool: not_a_tool");
    }

    #[tokio::test]
    async fn test_tool_error_is_contained() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo")));

        let ok = registry.execute("echo", json!({"text": "hi"})).await;
        assert_eq!(ok.to_message(), "hi");

        let failed = registry.execute("echo", json!({})).await;
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("Missing 'text' parameter"));
    }

    #[tokio::test]
    async fn test_execute_call_with_bad_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo")));

        let call = ToolCall::new("call_1", "echo", "{not json");
        let result = registry.execute_call(&call).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Invalid arguments for tool echo"));
    }

    #[test]
    fn test_register_replaces_and_keeps_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("b")));
        registry.register(Arc::new(EchoTool::new("a")));
        registry.register(Arc::new(EchoTool::new("b")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_default_manifest() {
        let registry = ToolRegistry::with_defaults(&ToolsConfig::default());
        assert_eq!(
            registry.names(),
            vec!["shell", "write_file", "edit_file", "read_file", "list_files"]
        );
        for definition in registry.to_manifest() {
            definition.validate().unwrap();
        }
    }
}
