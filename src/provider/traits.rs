//! Provider abstraction over remote completion services.
//!
//! One implementation exists per wire shape. The gateway holds a
//! `dyn ModelProvider` chosen at construction and never branches on the
//! provider name.

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

use crate::error::CrewResult;
use crate::provider::types::{ChatMessage, ChatOptions, ChatResponse, ModelInfo, StreamChunk};

/// Streamed completion.
pub type ChatStream = Pin<Box<dyn Stream<Item = CrewResult<StreamChunk>> + Send>>;

/// Core trait that all completion providers implement.
///
/// # Example
///
/// ```ignore
/// use crewkit::provider::{ChatMessage, ChatOptions, ModelProvider};
///
/// async fn ask(provider: &dyn ModelProvider) -> crewkit::CrewResult<String> {
///     let messages = vec![ChatMessage::user("Hello")];
///     let response = provider.chat(&messages, &ChatOptions::new()).await?;
///     Ok(response.content)
/// }
/// ```
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Single-shot completion.
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> CrewResult<ChatResponse>;

    /// Streamed completion. Tool calls may arrive in any number of
    /// `ToolCalls` items; the gateway merges them into one trailing item.
    async fn chat_stream(&self, messages: &[ChatMessage], options: &ChatOptions) -> CrewResult<ChatStream>;

    /// Models available to the configured credentials.
    async fn list_models(&self) -> CrewResult<Vec<ModelInfo>>;

    /// Provider identifier for logs.
    fn provider_name(&self) -> &str;

    /// Model used when the options carry none.
    fn default_model(&self) -> String;
}
