//! Tool manifests and tool-call requests.
//!
//! A [`ToolDefinition`] is what the model is told it may call; a
//! [`ToolCall`] is what the model asks for. The call id correlates the tool
//! message that later carries the result.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CrewError, CrewResult};

/// Provider-agnostic tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (function name)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// The schema must be an object with a `type` field.
    pub fn validate(&self) -> CrewResult<()> {
        let obj = self.parameters.as_object().ok_or_else(|| {
            CrewError::validation(format!("Tool {} parameters must be a JSON object", self.name))
        })?;
        if !obj.contains_key("type") {
            return Err(CrewError::validation(format!(
                "Tool {} parameters schema must have 'type' field",
                self.name
            )));
        }
        Ok(())
    }

    /// OpenAI `tools[]` entry.
    pub fn to_openai(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

fn function_type() -> String {
    "function".to_string()
}

/// Function name and JSON-encoded arguments of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    /// Build a function call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Decode the argument string. Blank arguments decode to `{}`.
    pub fn parse_arguments(&self) -> CrewResult<Value> {
        let raw = self.function.arguments.trim();
        if raw.is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(raw).map_err(|e| {
            CrewError::validation(format!(
                "Invalid arguments for tool {}: {}",
                self.function.name, e
            ))
        })
    }
}
