//! Agents: personas bound to the model gateway, the tools and the shared
//! conversation.
//!
//! Every persona runs the same loop. A turn streams model text to the
//! caller, executes any tool calls the model requests, feeds the results
//! back and asks again, until the model answers in plain text or the
//! iteration cap is reached. Only then is the accumulated text committed
//! to the conversation.

pub mod personas;
pub mod runtime;

pub use personas::Persona;
pub use runtime::{LoopPhase, LoopState, RuntimeConfig, DEFAULT_MAX_ITERATIONS};

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::conversation::{AgentRole, Message, SharedConversation};
use crate::error::{CrewError, CrewResult};
use crate::observability::Logger;
use crate::provider::{receiver_stream, ChatMessage, ChatOptions, ModelGateway, StreamChunk, ToolCall};
use crate::tools::ToolRegistry;

/// Item of an agent's output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A text fragment as produced by the model.
    Chunk {
        /// Agent producing the text.
        role: AgentRole,
        /// The fragment.
        content: String,
    },
    /// Questions found in a completed turn, about to be handed off.
    QuestionsDetected {
        /// Agent that asked.
        from: AgentRole,
        /// The detected question sentences.
        questions: Vec<String>,
    },
    /// The turn finished and its message was committed.
    Complete {
        /// Agent that finished.
        role: AgentRole,
        /// The committed message.
        message: Message,
    },
}

/// Stream of agent events. Dropping it stops the producing task.
pub type AgentStream = Pin<Box<dyn Stream<Item = CrewResult<AgentEvent>> + Send>>;

/// Result of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The message committed to the conversation.
    pub message: Message,
    /// Model calls made.
    pub iterations: u32,
    /// Whether the turn stopped at the iteration cap.
    pub hit_cap: bool,
}

/// Capability the orchestrator drives.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    /// Persona this agent runs.
    fn persona(&self) -> &Persona;

    /// Display name.
    fn name(&self) -> &str {
        &self.persona().name
    }

    /// Role the agent's messages are authored as.
    fn role(&self) -> AgentRole {
        self.persona().role
    }

    /// Run one turn. Text fragments go to `on_chunk` as they arrive; when
    /// it returns `false` the turn stops with [`CrewError::Cancelled`] and
    /// nothing is committed.
    async fn run_turn(
        &self,
        context: Option<&str>,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) -> bool + Send),
    ) -> CrewResult<TurnOutcome>;
}

/// Run one turn of `agent` on a background task and stream its events.
pub fn respond_stream(agent: Arc<dyn ChatAgent>, context: Option<String>) -> AgentStream {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let role = agent.role();
        let chunk_tx = tx.clone();
        let mut forward = move |chunk: &str| {
            chunk_tx
                .send(Ok(AgentEvent::Chunk {
                    role,
                    content: chunk.to_string(),
                }))
                .is_ok()
        };

        match agent.run_turn(context.as_deref(), &mut forward).await {
            Ok(outcome) => {
                let _ = tx.send(Ok(AgentEvent::Complete {
                    role,
                    message: outcome.message,
                }));
            }
            Err(CrewError::Cancelled) => debug!(role = %role, "Turn cancelled by consumer"),
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    });

    Box::pin(receiver_stream(rx))
}

/// The default agent implementation.
pub struct Agent {
    persona: Persona,
    gateway: Arc<ModelGateway>,
    tools: Arc<ToolRegistry>,
    store: SharedConversation,
    runtime: RuntimeConfig,
    logger: Option<Arc<Logger>>,
}

impl Agent {
    /// Bind `persona` to its collaborators.
    pub fn new(
        persona: Persona,
        gateway: Arc<ModelGateway>,
        tools: Arc<ToolRegistry>,
        store: SharedConversation,
    ) -> Self {
        Self {
            persona,
            gateway,
            tools,
            store,
            runtime: RuntimeConfig::default(),
            logger: None,
        }
    }

    /// Override the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.runtime.max_iterations = max_iterations;
        self
    }

    /// Write turns and tool executions to a transcript.
    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The conversation this agent reads and writes.
    pub fn store(&self) -> &SharedConversation {
        &self.store
    }

    /// System prompt, the conversation so far tagged by author, then
    /// `context` as the newest user turn.
    pub async fn build_messages(&self, context: Option<&str>) -> Vec<ChatMessage> {
        let history = self.store.read().await.messages();
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.persona.system_prompt.clone()));

        for message in history {
            let tagged = format!("{}: {}", message.role.tag(), message.content);
            if message.role == AgentRole::User {
                messages.push(ChatMessage::user(tagged));
            } else {
                messages.push(ChatMessage::assistant(tagged));
            }
        }

        if let Some(context) = context.filter(|c| !c.is_empty()) {
            messages.push(ChatMessage::user(context));
        }
        messages
    }

    fn chat_options(&self, with_tools: bool) -> ChatOptions {
        let mut options = ChatOptions::new();
        if let Some(temperature) = self.persona.temperature {
            options = options.with_temperature(temperature);
        }
        if with_tools && self.persona.use_tools {
            options = options.with_tools(self.tools.to_manifest());
        }
        options
    }

    /// Single-shot answer without tools or streaming; committed like a turn.
    pub async fn respond(&self, context: Option<&str>) -> CrewResult<Message> {
        let messages = self.build_messages(context).await;
        let response = self.gateway.chat(&messages, &self.chat_options(false)).await?;
        Ok(self.commit(response.content, 1).await)
    }

    async fn commit(&self, content: String, iterations: u32) -> Message {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_agent_turn(self.persona.role.as_str(), &content, iterations) {
                warn!(error = %e, "Failed to write transcript");
            }
        }
        self.store
            .write()
            .await
            .add_message(self.persona.role, content, None)
    }

    async fn execute_tools(&self, calls: &[ToolCall], messages: &mut Vec<ChatMessage>) {
        for call in calls {
            let result = self.tools.execute_call(call).await;
            let content = result.to_message();
            if let Some(logger) = &self.logger {
                if let Err(e) =
                    logger.log_tool_execution(call.name(), &call.function.arguments, &content, result.success)
                {
                    warn!(error = %e, "Failed to write transcript");
                }
            }
            messages.push(ChatMessage::tool(call.id.clone(), content));
        }
    }
}

#[async_trait]
impl ChatAgent for Agent {
    fn persona(&self) -> &Persona {
        &self.persona
    }

    async fn run_turn(
        &self,
        context: Option<&str>,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) -> bool + Send),
    ) -> CrewResult<TurnOutcome> {
        let role = self.persona.role;
        let mut messages = self.build_messages(context).await;
        let options = self.chat_options(true);
        let mut state = LoopState::new(self.runtime.clone());
        let mut accumulated = String::new();

        info!(role = %role, history = messages.len(), "Agent turn started");

        while state.begin_iteration() {
            debug!(role = %role, iteration = state.iteration(), "Calling model");
            let mut stream = self.gateway.stream_chat(&messages, &options).await?;
            let mut turn_text = String::new();
            let mut calls = Vec::new();

            while let Some(item) = stream.next().await {
                match item? {
                    StreamChunk::Text(text) => {
                        state.transition(LoopPhase::TextStreaming);
                        if !on_chunk(&text) {
                            return Err(CrewError::Cancelled);
                        }
                        turn_text.push_str(&text);
                    }
                    StreamChunk::ToolCalls(batch) => calls.extend(batch),
                }
            }
            accumulated.push_str(&turn_text);

            if calls.is_empty() {
                state.finish();
                break;
            }

            if !state.has_next() {
                // The results could never reach the model.
                state.stop_at_cap();
                break;
            }

            state.transition(LoopPhase::ToolCallsPending);
            debug!(
                role = %role,
                tools = ?calls.iter().map(|c| c.name()).collect::<Vec<_>>(),
                "Executing tool calls"
            );
            messages.push(ChatMessage::assistant_with_tool_calls(turn_text, calls.clone()));
            state.transition(LoopPhase::ExecutingTools);
            self.execute_tools(&calls, &mut messages).await;
        }

        if state.hit_cap() {
            warn!(
                role = %role,
                max_iterations = self.runtime.max_iterations,
                "Iteration cap reached, skipping pending tool calls"
            );
        }

        let iterations = state.iteration();
        let message = self.commit(accumulated, iterations).await;
        Ok(TurnOutcome {
            message,
            iterations,
            hit_cap: state.hit_cap(),
        })
    }
}
