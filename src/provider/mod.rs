//! Model provider abstraction.
//!
//! This module provides the [`ModelProvider`] trait, one implementation per
//! wire shape (OpenAI-compatible and Gemini), a scripted provider for tests,
//! and the [`ModelGateway`] that wraps providers with retry, circuit
//! breaking and timeouts.

pub mod factory;
pub mod gateway;
pub mod gemini;
pub mod openai;
pub mod scripted;
pub mod stream;
pub mod traits;
pub mod types;

// Re-export main types
pub use factory::ProviderFactory;
pub use gateway::{GatewaySettings, ModelGateway};
pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatibleProvider;
pub use scripted::{ScriptedProvider, ScriptedTurn};
pub use stream::receiver_stream;
pub use traits::{ChatStream, ModelProvider};
pub use types::{
    ChatMessage, ChatOptions, ChatResponse, ChatRole, FunctionCall, ModelInfo, StreamChunk, ToolCall,
    ToolDefinition, Usage,
};
