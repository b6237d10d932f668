//! Request options and normalized responses.

use serde::{Deserialize, Serialize};

use super::tools::{ToolCall, ToolDefinition};
use crate::error::{CrewError, CrewResult};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Options for one completion request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Model override (None = credentials source default)
    pub model: Option<String>,
    /// Temperature for sampling (None = 0.7)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Tool manifest offered to the model
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ChatOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set tools. An empty manifest is treated as no tools.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    /// Effective temperature.
    pub fn temperature_or_default(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Reject out-of-range values before anything goes on the wire.
    pub fn validate(&self) -> CrewResult<()> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(CrewError::validation(format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    t
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(CrewError::validation("max_tokens must be greater than 0"));
        }
        if let Some(tools) = &self.tools {
            for tool in tools {
                tool.validate()?;
            }
        }
        Ok(())
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Normalized single-shot response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// True when the model asked for at least one tool.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().map(|c| !c.is_empty()).unwrap_or(false)
    }
}

/// One item of a streamed response.
///
/// Text fragments arrive as they are produced. Tool calls, if any, arrive
/// once, after all text.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Text(String),
    ToolCalls(Vec<ToolCall>),
}

/// A model offered by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}
