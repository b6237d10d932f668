//! Events emitted by the multi-agent protocols.

use futures_util::Stream;
use std::pin::Pin;

use crate::agent::AgentEvent;
use crate::conversation::{AgentRole, Message};
use crate::error::CrewResult;

/// Progress of a review cycle or brainstorm, one agent turn at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// An agent is about to speak.
    Start {
        /// Agent starting its turn.
        role: AgentRole,
    },
    /// A text fragment of the current turn.
    Chunk {
        /// Agent producing the text.
        role: AgentRole,
        /// The fragment.
        content: String,
    },
    /// Questions in the finished turn are being handed to the questioner.
    QuestionsDetected {
        /// Agent that asked.
        from: AgentRole,
        /// The detected question sentences.
        questions: Vec<String>,
    },
    /// A turn finished.
    Complete {
        /// Agent that finished.
        role: AgentRole,
        /// Full text of the turn.
        content: String,
        /// Committed message. `None` for the synthetic forced approval.
        message: Option<Message>,
        /// Critic verdict, set only for review turns.
        approved: Option<bool>,
    },
}

impl ProtocolEvent {
    /// Completion of an ordinary turn.
    pub fn completed(message: Message) -> Self {
        Self::Complete {
            role: message.role,
            content: message.content.clone(),
            message: Some(message),
            approved: None,
        }
    }

    /// Agent the event belongs to.
    pub fn role(&self) -> AgentRole {
        match self {
            Self::Start { role } | Self::Chunk { role, .. } | Self::Complete { role, .. } => *role,
            Self::QuestionsDetected { from, .. } => *from,
        }
    }

    /// Protocol events for an event of a single agent run.
    ///
    /// A detected question also announces the questioner's turn.
    pub(crate) fn from_agent_event(event: AgentEvent) -> Vec<Self> {
        match event {
            AgentEvent::Chunk { role, content } => vec![Self::Chunk { role, content }],
            AgentEvent::QuestionsDetected { from, questions } => vec![
                Self::QuestionsDetected { from, questions },
                Self::Start {
                    role: AgentRole::Questioner,
                },
            ],
            AgentEvent::Complete { message, .. } => vec![Self::completed(message)],
        }
    }
}

/// Stream of protocol events. Dropping it stops the protocol.
pub type ProtocolStream = Pin<Box<dyn Stream<Item = CrewResult<ProtocolEvent>> + Send>>;
