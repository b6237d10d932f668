//! Gemini `generateContent` mapping.
//!
//! Gemini speaks in `contents` with `user`/`model` roles and function-call
//! parts instead of OpenAI tool-call lists. Call ids do not exist on the
//! wire, so they are minted as `<name>-<counter>` and mapped back to function
//! names when tool results are replayed.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{CrewError, CrewResult};
use crate::provider::openai::DEFAULT_MAX_TOKENS;
use crate::provider::stream::{receiver_stream, SseBuffer, SseEvent};
use crate::provider::traits::{ChatStream, ModelProvider};
use crate::provider::types::{
    ChatMessage, ChatOptions, ChatResponse, ChatRole, ModelInfo, StreamChunk, ToolCall, Usage,
};

/// Provider for Google's Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    call_counter: Arc<AtomicU64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCallPart>,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPart {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiModelList {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Debug, Deserialize)]
struct GeminiModel {
    name: String,
}

impl GeminiProvider {
    /// Create a provider for `base_url` (e.g. `https://generativelanguage.googleapis.com/v1beta`).
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            call_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Override the default response token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// JSON body for `generateContent`.
    pub fn build_request_body(&self, messages: &[ChatMessage], options: &ChatOptions) -> Value {
        // Tool results only carry the call id; recover the function name.
        let mut call_names: HashMap<&str, &str> = HashMap::new();
        for message in messages {
            for call in message.tool_calls.iter().flatten() {
                call_names.insert(call.id.as_str(), call.function.name.as_str());
            }
        }

        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for message in messages {
            match message.role {
                ChatRole::System => system_parts.push(json!({"text": message.content_str()})),
                ChatRole::User => contents.push(json!({
                    "role": "user",
                    "parts": [{"text": message.content_str()}],
                })),
                ChatRole::Assistant => {
                    let mut parts = Vec::new();
                    if !message.content_str().is_empty() {
                        parts.push(json!({"text": message.content_str()}));
                    }
                    for call in message.tool_calls.iter().flatten() {
                        let args = call.parse_arguments().unwrap_or_else(|_| json!({}));
                        parts.push(json!({
                            "functionCall": {"name": call.function.name, "args": args}
                        }));
                    }
                    if !parts.is_empty() {
                        contents.push(json!({"role": "model", "parts": parts}));
                    }
                }
                ChatRole::Tool => {
                    let id = message.tool_call_id.as_deref().unwrap_or_default();
                    let name = call_names.get(id).copied().unwrap_or(id);
                    contents.push(json!({
                        "role": "user",
                        "parts": [{
                            "functionResponse": {
                                "name": name,
                                "response": {"content": message.content_str()},
                            }
                        }],
                    }));
                }
            }
        }

        let mut body = Map::new();
        body.insert("contents".to_string(), Value::Array(contents));
        if !system_parts.is_empty() {
            body.insert("systemInstruction".to_string(), json!({"parts": system_parts}));
        }
        if let Some(tools) = options.tools.as_ref().filter(|t| !t.is_empty()) {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|t| json!({"name": t.name, "description": t.description, "parameters": t.parameters}))
                .collect();
            body.insert("tools".to_string(), json!([{"functionDeclarations": declarations}]));
        }
        body.insert(
            "generationConfig".to_string(),
            json!({
                "temperature": options.temperature_or_default(),
                "maxOutputTokens": options.max_tokens.unwrap_or(self.max_tokens),
            }),
        );
        Value::Object(body)
    }

    fn model_url(&self, options: &ChatOptions, method: &str) -> String {
        let model = options.model.as_deref().unwrap_or(&self.model);
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn next_call_id(&self, name: &str) -> String {
        let n = self.call_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", name, n)
    }

    /// Split a response into text and minted tool calls.
    fn split_parts(&self, response: GenerateContentResponse) -> (String, Vec<ToolCall>) {
        let mut text = String::new();
        let mut calls = Vec::new();
        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        for part in parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                let id = self.next_call_id(&call.name);
                let args = if call.args.is_null() { json!({}) } else { call.args };
                calls.push(ToolCall::new(id, call.name, args.to_string()));
            }
        }
        (text, calls)
    }

    async fn post(&self, url: String, body: &Value) -> CrewResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
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

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> CrewResult<ChatResponse> {
        let body = self.build_request_body(messages, options);
        let response = self.post(self.model_url(options, "generateContent"), &body).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CrewError::llm(format!("Invalid response from LLM: {}", e)))?;

        if parsed.candidates.is_empty() {
            return Err(CrewError::llm("No choice returned from LLM"));
        }
        let usage = parsed.usage_metadata.as_ref().map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });
        let (content, calls) = self.split_parts(parsed);

        Ok(ChatResponse {
            content,
            tool_calls: if calls.is_empty() { None } else { Some(calls) },
            usage,
        })
    }

    async fn chat_stream(&self, messages: &[ChatMessage], options: &ChatOptions) -> CrewResult<ChatStream> {
        let body = self.build_request_body(messages, options);
        let url = format!("{}?alt=sse", self.model_url(options, "streamGenerateContent"));
        let response = self.post(url, &body).await?;
        debug!(model = %self.model, "Gemini stream opened");

        let provider = self.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut sse = SseBuffer::new();
            let mut pending = Vec::new();

            let mut handle = |payload: String| -> bool {
                let parsed: GenerateContentResponse = match serde_json::from_str(&payload) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed Gemini stream event");
                        return true;
                    }
                };
                let (text, calls) = provider.split_parts(parsed);
                pending.extend(calls);
                text.is_empty() || tx.send(Ok(StreamChunk::Text(text))).is_ok()
            };

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
                            if !handle(payload) {
                                return;
                            }
                        }
                    }
                }
            }
            if let Some(SseEvent::Data(payload)) = sse.finish() {
                if !handle(payload) {
                    return;
                }
            }
            if !pending.is_empty() {
                let _ = tx.send(Ok(StreamChunk::ToolCalls(pending)));
            }
        });

        Ok(Box::pin(receiver_stream(rx)))
    }

    async fn list_models(&self) -> CrewResult<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| CrewError::api(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CrewError::api(format!("API error {}: {}", status, error_body)));
        }

        let list: GeminiModelList = response
            .json()
            .await
            .map_err(|e| CrewError::api(format!("Invalid model list: {}", e)))?;
        Ok(list
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.trim_start_matches("models/").to_string(),
                owned_by: Some("google".to_string()),
            })
            .collect())
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> String {
        self.model.clone()
    }
}
