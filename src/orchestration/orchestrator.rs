//! Multi-agent coordinator.

use futures_util::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

use super::events::{ProtocolEvent, ProtocolStream};
use super::questions::detect_questions;
use crate::agent::{Agent, AgentEvent, AgentStream, ChatAgent, Persona};
use crate::config::{Configuration, OrchestratorConfig};
use crate::conversation::{AgentRole, Message, SharedConversation};
use crate::error::{CrewError, CrewResult};
use crate::observability::Logger;
use crate::provider::{receiver_stream, ModelGateway};
use crate::tools::ToolRegistry;

const REVIEW_PROMPT: &str = "Please review the latest code.";
const REVISE_PROMPT: &str = "Please address the feedback from the Critic and update the code.";

/// Speaking order of a brainstorm.
pub const BRAINSTORM_ORDER: [AgentRole; 4] = [
    AgentRole::Architect,
    AgentRole::Coder,
    AgentRole::Critic,
    AgentRole::EndUser,
];

/// Decides whether a critic's review approves the code.
pub type ApprovalCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

type Emit<'a> = &'a mut (dyn FnMut(AgentEvent) -> bool + Send);
type ProtocolSender = UnboundedSender<CrewResult<ProtocolEvent>>;

/// Default verdict heuristic.
///
/// Approved when the review mentions "approved" and mentions neither
/// "needs changes" nor "needs discussion", ignoring case. A review saying
/// "not yet approved" still passes; use
/// [`Orchestrator::with_approval_check`] for a stricter rule.
pub fn default_approval(review: &str) -> bool {
    let lower = review.to_lowercase();
    lower.contains("approved") && !lower.contains("needs changes") && !lower.contains("needs discussion")
}

/// Holds one agent per role and runs them alone or in protocols.
///
/// Protocols run their agents strictly one after another on a spawned task
/// and report progress as a stream. Dropping the stream stops the protocol
/// before its next agent turn is committed.
#[derive(Clone)]
pub struct Orchestrator {
    agents: Arc<HashMap<AgentRole, Arc<dyn ChatAgent>>>,
    enabled: Arc<HashSet<AgentRole>>,
    config: OrchestratorConfig,
    store: SharedConversation,
    logger: Option<Arc<Logger>>,
    approval_check: ApprovalCheck,
}

impl Orchestrator {
    /// Build the six default agents over shared collaborators.
    pub fn from_config(
        config: &Configuration,
        gateway: Arc<ModelGateway>,
        tools: Arc<ToolRegistry>,
        store: SharedConversation,
        logger: Option<Arc<Logger>>,
    ) -> Self {
        let agents = Persona::defaults()
            .into_iter()
            .map(|persona| {
                let mut agent = Agent::new(persona, gateway.clone(), tools.clone(), store.clone())
                    .with_max_iterations(config.execution.max_iterations);
                if let Some(logger) = &logger {
                    agent = agent.with_logger(logger.clone());
                }
                Arc::new(agent) as Arc<dyn ChatAgent>
            })
            .collect();

        let orchestrator = Self::with_agents(config.orchestrator.clone(), agents, store);
        match logger {
            Some(logger) => orchestrator.with_logger(logger),
            None => orchestrator,
        }
    }

    /// Orchestrate the given agents. A later agent replaces an earlier one
    /// with the same role.
    pub fn with_agents(
        config: OrchestratorConfig,
        agents: Vec<Arc<dyn ChatAgent>>,
        store: SharedConversation,
    ) -> Self {
        let agents: HashMap<_, _> = agents.into_iter().map(|agent| (agent.role(), agent)).collect();

        let mut enabled = HashSet::new();
        for name in &config.enabled_agents {
            match name.parse::<AgentRole>() {
                Ok(role) if role.is_agent() => {
                    enabled.insert(role);
                }
                _ => warn!(agent = %name, "Ignoring unknown entry in enabled_agents"),
            }
        }

        Self {
            agents: Arc::new(agents),
            enabled: Arc::new(enabled),
            config,
            store,
            logger: None,
            approval_check: Arc::new(default_approval),
        }
    }

    /// Record verdicts and hand-offs in a transcript.
    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the review verdict heuristic.
    pub fn with_approval_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.approval_check = Arc::new(check);
        self
    }

    /// Protocol settings.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The conversation every agent shares.
    pub fn store(&self) -> &SharedConversation {
        &self.store
    }

    /// Agent registered for `role`, enabled or not.
    pub fn agent(&self, role: AgentRole) -> Option<Arc<dyn ChatAgent>> {
        self.agents.get(&role).cloned()
    }

    /// Whether `role` is registered and listed in `enabled_agents`.
    pub fn is_enabled(&self, role: AgentRole) -> bool {
        self.enabled.contains(&role) && self.agents.contains_key(&role)
    }

    /// Enabled roles in persona order.
    pub fn enabled_agents(&self) -> Vec<AgentRole> {
        AgentRole::AGENTS
            .into_iter()
            .filter(|role| self.is_enabled(*role))
            .collect()
    }

    /// Append a message from the human so the next agent turn sees it.
    pub async fn add_user_message(&self, content: impl Into<String>) -> Message {
        self.store.write().await.add_message(AgentRole::User, content, None)
    }

    /// Label the work in progress.
    pub async fn set_current_task(&self, task: Option<String>) {
        self.store.write().await.set_current_task(task);
    }

    /// Task, review cycle and message counts.
    pub async fn conversation_summary(&self) -> String {
        self.store.read().await.context_summary()
    }

    /// Forget the whole conversation, including the review counter.
    pub async fn clear_conversation(&self) {
        self.store.write().await.clear();
        info!("Conversation cleared");
    }

    /// Run one agent turn, followed by a question hand-off when needed.
    ///
    /// The stream ends with the asking agent's `Complete`. A disabled role
    /// yields a single error item.
    pub fn run_agent(&self, role: AgentRole, context: Option<String>) -> AgentStream {
        let (tx, rx) = mpsc::unbounded_channel::<CrewResult<AgentEvent>>();
        let this = self.clone();

        tokio::spawn(async move {
            let mut emit = |event: AgentEvent| tx.send(Ok(event)).is_ok();
            let result = this.drive_agent(role, context.as_deref(), 0, &mut emit).await;
            match result {
                Ok(message) => {
                    let _ = tx.send(Ok(AgentEvent::Complete { role, message }));
                }
                Err(CrewError::Cancelled) => debug!(role = %role, "Agent run cancelled by consumer"),
                Err(e) => {
                    this.log_failure(&e, role);
                    let _ = tx.send(Err(e));
                }
            }
        });

        Box::pin(receiver_stream(rx))
    }

    /// Critic review loop.
    ///
    /// Each cycle increments the conversation's review counter and asks the
    /// critic for a review. Without approval, and while cycles remain, the
    /// end user and then the coder respond before the next review. Once the
    /// counter passes `max_review_cycles` approval is forced.
    pub fn run_review_cycle(&self) -> ProtocolStream {
        self.spawn_protocol("review", |this, tx| Box::pin(async move { this.review(&tx).await }))
    }

    /// Architect, coder, critic and end user each add their view of `topic`.
    pub fn brainstorm(&self, topic: impl Into<String>) -> ProtocolStream {
        let topic = topic.into();
        self.spawn_protocol("brainstorm", move |this, tx| {
            Box::pin(async move { this.run_brainstorm(&topic, &tx).await })
        })
    }

    fn spawn_protocol<F>(&self, name: &'static str, body: F) -> ProtocolStream
    where
        F: FnOnce(Orchestrator, ProtocolSender) -> BoxFuture<'static, CrewResult<()>> + Send + 'static,
    {
        let (tx, rx): (ProtocolSender, _) = mpsc::unbounded_channel();
        let this = self.clone();

        tokio::spawn(async move {
            info!(protocol = name, "Protocol started");
            let result = body(this.clone(), tx.clone()).await;
            match result {
                Ok(()) => info!(protocol = name, "Protocol finished"),
                Err(CrewError::Cancelled) => debug!(protocol = name, "Protocol cancelled by consumer"),
                Err(e) => {
                    warn!(protocol = name, error = %e, "Protocol failed");
                    this.log_failure(&e, AgentRole::User);
                    let _ = tx.send(Err(e));
                }
            }
        });

        Box::pin(receiver_stream(rx))
    }

    async fn review(&self, tx: &ProtocolSender) -> CrewResult<()> {
        let max_cycles = self.config.max_review_cycles;

        loop {
            let cycle = self.store.write().await.increment_review_cycle();

            if cycle > max_cycles {
                info!(max_cycles, "Review cycle limit reached, forcing approval");
                self.transcript(|logger| logger.log_review_verdict(cycle, true, true));
                return send(
                    tx,
                    ProtocolEvent::Complete {
                        role: AgentRole::Critic,
                        content: format!(
                            "Maximum review cycles ({}) reached. Please review the results.",
                            max_cycles
                        ),
                        message: None,
                        approved: Some(true),
                    },
                );
            }

            let review = self.protocol_turn(AgentRole::Critic, Some(REVIEW_PROMPT), tx).await?;
            let approved = (self.approval_check)(&review.content);
            info!(cycle, approved, "Review verdict");
            self.transcript(|logger| logger.log_review_verdict(cycle, approved, false));
            send(
                tx,
                ProtocolEvent::Complete {
                    role: AgentRole::Critic,
                    content: review.content.clone(),
                    message: Some(review),
                    approved: Some(approved),
                },
            )?;

            if approved {
                return Ok(());
            }
            if cycle >= max_cycles {
                continue;
            }

            if self.is_enabled(AgentRole::EndUser) {
                let message = self.protocol_turn(AgentRole::EndUser, None, tx).await?;
                send(tx, ProtocolEvent::completed(message))?;
            }
            if self.is_enabled(AgentRole::Coder) {
                let message = self.protocol_turn(AgentRole::Coder, Some(REVISE_PROMPT), tx).await?;
                send(tx, ProtocolEvent::completed(message))?;
            }
        }
    }

    async fn run_brainstorm(&self, topic: &str, tx: &ProtocolSender) -> CrewResult<()> {
        for role in BRAINSTORM_ORDER {
            if !self.is_enabled(role) {
                debug!(role = %role, "Skipping disabled agent in brainstorm");
                continue;
            }
            let prompt = if role == AgentRole::Architect {
                format!("Let's brainstorm about: {}\n\nProvide your architectural perspective.", topic)
            } else {
                format!(
                    "Continue the brainstorm about: {}\n\nAdd your perspective considering what others have said.",
                    topic
                )
            };
            let message = self.protocol_turn(role, Some(&prompt), tx).await?;
            send(tx, ProtocolEvent::completed(message))?;
        }
        Ok(())
    }

    /// `Start`, then the turn's chunks and any hand-off. The caller sends
    /// the turn's `Complete`.
    async fn protocol_turn(
        &self,
        role: AgentRole,
        context: Option<&str>,
        tx: &ProtocolSender,
    ) -> CrewResult<Message> {
        send(tx, ProtocolEvent::Start { role })?;
        let mut emit = |event: AgentEvent| {
            ProtocolEvent::from_agent_event(event)
                .into_iter()
                .all(|event| tx.send(Ok(event)).is_ok())
        };
        self.drive_agent(role, context, 0, &mut emit).await
    }

    /// Run `role`'s turn and hand its questions off. Emits chunks and the
    /// hand-off's events but not the final `Complete` of `role`.
    fn drive_agent<'a>(
        &'a self,
        role: AgentRole,
        context: Option<&'a str>,
        depth: u32,
        emit: Emit<'a>,
    ) -> BoxFuture<'a, CrewResult<Message>> {
        Box::pin(async move {
            if !self.is_enabled(role) {
                return Err(CrewError::agent(
                    role.as_str(),
                    format!("Agent {} is not enabled", role),
                ));
            }
            let agent = self
                .agent(role)
                .ok_or_else(|| CrewError::agent(role.as_str(), format!("Unknown agent type: {}", role)))?;

            let outcome = {
                let mut forward = |chunk: &str| {
                    emit(AgentEvent::Chunk {
                        role,
                        content: chunk.to_string(),
                    })
                };
                agent.run_turn(context, &mut forward).await?
            };
            if outcome.hit_cap {
                debug!(role = %role, iterations = outcome.iterations, "Turn ended at the iteration cap");
            }

            self.hand_off(role, &outcome.message, depth, emit).await?;
            Ok(outcome.message)
        })
    }

    async fn hand_off(&self, from: AgentRole, message: &Message, depth: u32, emit: Emit<'_>) -> CrewResult<()> {
        if !self.config.auto_answer_questions
            || from == AgentRole::Questioner
            || depth >= self.config.max_handoff_depth
            || !self.is_enabled(AgentRole::Questioner)
        {
            return Ok(());
        }

        let questions = detect_questions(&message.content);
        if questions.is_empty() {
            return Ok(());
        }

        info!(from = %from, count = questions.len(), "Handing questions to the questioner");
        self.transcript(|logger| logger.log_handoff(from.as_str(), AgentRole::Questioner.as_str(), &questions));

        let prompt = handoff_prompt(from, &questions);
        if !emit(AgentEvent::QuestionsDetected { from, questions }) {
            return Err(CrewError::Cancelled);
        }

        let answer = self
            .drive_agent(AgentRole::Questioner, Some(&prompt), depth + 1, &mut *emit)
            .await?;
        if !emit(AgentEvent::Complete {
            role: AgentRole::Questioner,
            message: answer,
        }) {
            return Err(CrewError::Cancelled);
        }
        Ok(())
    }

    fn transcript(&self, write: impl FnOnce(&Logger) -> anyhow::Result<()>) {
        if let Some(logger) = &self.logger {
            if let Err(e) = write(logger) {
                warn!(error = %e, "Failed to write transcript");
            }
        }
    }

    fn log_failure(&self, error: &CrewError, role: AgentRole) {
        let context = HashMap::from([
            ("code".to_string(), serde_json::Value::from(error.code())),
            ("role".to_string(), serde_json::Value::from(role.as_str())),
        ]);
        self.transcript(|logger| logger.log_error(&error.to_string(), Some(&context)));
    }
}

fn handoff_prompt(from: AgentRole, questions: &[String]) -> String {
    let list = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "The {} agent asked:\n{}\n\nPlease answer these questions so the work can continue.",
        from, list
    )
}

fn send(tx: &ProtocolSender, event: ProtocolEvent) -> CrewResult<()> {
    tx.send(Ok(event)).map_err(|_| CrewError::Cancelled)
}

#[cfg(test)]
mod tests;
