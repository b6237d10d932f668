//! OpenAI-compatible chat completions over HTTP.
//!
//! Serves OpenAI, Anthropic's compatibility endpoint, OpenRouter and any
//! custom endpoint speaking the same protocol.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

use crate::error::{CrewError, CrewResult};
use crate::provider::stream::{receiver_stream, SseBuffer, SseEvent, ToolCallAccumulator};
use crate::provider::traits::{ChatStream, ModelProvider};
use crate::provider::types::{
    ChatMessage, ChatOptions, ChatResponse, ModelInfo, StreamChunk, ToolCall, Usage,
};

/// Default response token cap.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Provider for endpoints implementing `/chat/completions` and `/models`.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    name: String,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

impl OpenAiCompatibleProvider {
    /// Create a provider for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        name: impl Into<String>,
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Override the default response token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// JSON body for `/chat/completions`.
    pub fn build_request_body(&self, messages: &[ChatMessage], options: &ChatOptions, stream: bool) -> Value {
        let mut body = json!({
            "model": options.model.clone().unwrap_or_else(|| self.model.clone()),
            "messages": messages,
            "max_tokens": options.max_tokens.unwrap_or(self.max_tokens),
            "temperature": options.temperature_or_default(),
            "stream": stream,
        });

        if let Some(tools) = options.tools.as_ref().filter(|t| !t.is_empty()) {
            body["tools"] = Value::Array(tools.iter().map(|t| t.to_openai()).collect());
            body["tool_choice"] = json!("auto");
        }
        body
    }

    async fn post(&self, body: &Value, stream: bool) -> CrewResult<reqwest::Response> {
        let mut request = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(body);
        if stream {
            request = request.header("Accept", "text/event-stream");
        }

        let response = request
            .send()
            .await
            .map_err(|e| CrewError::api(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CrewError::api(format!("API error {}: {}", status, error_body)));
        }
        Ok(response)
    }
}

/// Forward one decoded stream payload. Returns false once the receiver is gone.
fn forward_payload(
    payload: &str,
    tx: &UnboundedSender<CrewResult<StreamChunk>>,
    calls: &mut ToolCallAccumulator,
) -> bool {
    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Skipping malformed stream event");
            return true;
        }
    };

    if let Some(error) = event.error {
        let _ = tx.send(Err(CrewError::api(format!("Stream error: {}", error))));
        return false;
    }

    for choice in event.choices {
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            if tx.send(Ok(StreamChunk::Text(text))).is_err() {
                return false;
            }
        }
        for delta in choice.delta.tool_calls.unwrap_or_default() {
            let (name, arguments) = match &delta.function {
                Some(f) => (f.name.as_deref(), f.arguments.as_deref()),
                None => (None, None),
            };
            calls.push(delta.index, delta.id.as_deref(), name, arguments);
        }
    }
    true
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> CrewResult<ChatResponse> {
        let body = self.build_request_body(messages, options, false);
        let response = self.post(&body, false).await?;

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CrewError::llm(format!("Invalid response from LLM: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CrewError::llm("No choice returned from LLM"))?;
        let message = choice
            .message
            .ok_or_else(|| CrewError::llm("No response from LLM"))?;

        Ok(ChatResponse {
            content: message.content.unwrap_or_default(),
            tool_calls: message.tool_calls.filter(|c| !c.is_empty()),
            usage: parsed.usage,
        })
    }

    async fn chat_stream(&self, messages: &[ChatMessage], options: &ChatOptions) -> CrewResult<ChatStream> {
        let body = self.build_request_body(messages, options, true);
        let response = self.post(&body, true).await?;
        debug!(provider = %self.name, "Streaming response opened");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut sse = SseBuffer::new();
            let mut calls = ToolCallAccumulator::new();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(CrewError::api(format!("Stream connection error: {}", e))));
                        return;
                    }
                };
                for event in sse.push(&chunk) {
                    match event {
                        SseEvent::Done => break 'read,
                        SseEvent::Data(payload) => {
                            if !forward_payload(&payload, &tx, &mut calls) {
                                return;
                            }
                        }
                    }
                }
            }

            if let Some(SseEvent::Data(payload)) = sse.finish() {
                if !forward_payload(&payload, &tx, &mut calls) {
                    return;
                }
            }
            if !calls.is_empty() {
                let _ = tx.send(Ok(StreamChunk::ToolCalls(calls.finish())));
            }
        });

        Ok(Box::pin(receiver_stream(rx)))
    }

    async fn list_models(&self) -> CrewResult<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| CrewError::api(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CrewError::api(format!("API error {}: {}", status, error_body)));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| CrewError::api(format!("Invalid model list: {}", e)))?;
        Ok(list.data)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> String {
        self.model.clone()
    }
}
