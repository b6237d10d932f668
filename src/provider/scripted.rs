//! Scripted provider for tests and offline runs.
//!
//! Replays queued turns in order, or computes each turn from the incoming
//! messages with a responder closure.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{CrewError, CrewResult};
use crate::provider::traits::{ChatStream, ModelProvider};
use crate::provider::types::{ChatMessage, ChatOptions, ChatResponse, ModelInfo, StreamChunk, ToolCall};

/// One scripted model turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedTurn {
    /// Text fragments streamed in order.
    pub chunks: Vec<String>,
    /// Tool calls requested at the end of the turn.
    pub tool_calls: Vec<ToolCall>,
}

impl ScriptedTurn {
    /// A plain-text turn streamed as one fragment.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            chunks: vec![content.into()],
            tool_calls: Vec::new(),
        }
    }

    /// A plain-text turn streamed as several fragments.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            tool_calls: Vec::new(),
        }
    }

    /// A turn that requests tools.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            chunks: Vec::new(),
            tool_calls: calls,
        }
    }

    /// Add leading text to a tool-call turn.
    pub fn with_text(mut self, content: impl Into<String>) -> Self {
        self.chunks.insert(0, content.into());
        self
    }

    fn content(&self) -> String {
        self.chunks.concat()
    }
}

type Responder = Box<dyn Fn(&[ChatMessage]) -> ScriptedTurn + Send + Sync>;

/// Provider that answers from a script instead of the network.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<CrewResult<ScriptedTurn>>>,
    fallback: Option<ScriptedTurn>,
    responder: Option<Responder>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    models: Vec<ModelInfo>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    /// Provider with an empty script.
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            fallback: None,
            responder: None,
            requests: Mutex::new(Vec::new()),
            models: vec![ModelInfo {
                id: "scripted-model".to_string(),
                owned_by: Some("crewkit".to_string()),
            }],
        }
    }

    /// Provider that replays `turns` in order.
    pub fn with_turns(turns: Vec<ScriptedTurn>) -> Self {
        let provider = Self::new();
        for turn in turns {
            provider.push_turn(turn);
        }
        provider
    }

    /// Provider computing each turn from the request messages.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> ScriptedTurn + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Turn returned once the queue is empty.
    pub fn with_fallback(mut self, turn: ScriptedTurn) -> Self {
        self.fallback = Some(turn);
        self
    }

    /// Models reported by `list_models`, unsorted.
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    /// Queue a turn.
    pub fn push_turn(&self, turn: ScriptedTurn) {
        self.queue().push_back(Ok(turn));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: CrewError) {
        self.queue().push_back(Err(error));
    }

    /// Message lists received so far, one per call.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of chat or stream calls received.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<CrewResult<ScriptedTurn>>> {
        self.turns.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_turn(&self, messages: &[ChatMessage]) -> CrewResult<ScriptedTurn> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());

        if let Some(turn) = self.queue().pop_front() {
            return turn;
        }
        if let Some(responder) = &self.responder {
            return Ok(responder(messages));
        }
        self.fallback
            .clone()
            .ok_or_else(|| CrewError::llm("No response from LLM"))
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn chat(&self, messages: &[ChatMessage], _options: &ChatOptions) -> CrewResult<ChatResponse> {
        let turn = self.next_turn(messages)?;
        Ok(ChatResponse {
            content: turn.content(),
            tool_calls: if turn.tool_calls.is_empty() {
                None
            } else {
                Some(turn.tool_calls)
            },
            usage: None,
        })
    }

    async fn chat_stream(&self, messages: &[ChatMessage], _options: &ChatOptions) -> CrewResult<ChatStream> {
        let turn = self.next_turn(messages)?;
        let mut items: Vec<CrewResult<StreamChunk>> = turn
            .chunks
            .into_iter()
            .map(|c| Ok(StreamChunk::Text(c)))
            .collect();
        if !turn.tool_calls.is_empty() {
            items.push(Ok(StreamChunk::ToolCalls(turn.tool_calls)));
        }
        Ok(Box::pin(futures_util::stream::iter(items)))
    }

    async fn list_models(&self) -> CrewResult<Vec<ModelInfo>> {
        Ok(self.models.clone())
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> String {
        "scripted-model".to_string()
    }
}
