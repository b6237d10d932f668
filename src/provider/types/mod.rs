//! Provider module types

pub mod generate;
pub mod message;
pub mod tools;

pub use generate::{ChatOptions, ChatResponse, ModelInfo, StreamChunk, Usage, DEFAULT_TEMPERATURE};
pub use message::{ChatMessage, ChatRole};
pub use tools::{FunctionCall, ToolCall, ToolDefinition};
