//! Cross-agent coordination.
//!
//! The [`Orchestrator`] owns one agent per role and composes them:
//!
//! - **run one agent** on a message, streaming its output;
//! - **review cycle**: critic reviews, end user and coder respond, repeat
//!   until approval or the cycle limit forces it;
//! - **brainstorm**: architect, coder, critic and end user speak in turn;
//! - **question hand-off**: questions found in a finished turn go to the
//!   questioner, whose answer lands in the conversation before the turn
//!   completes.
//!
//! # Example
//!
//! ```no_run
//! use crewkit::config::{ConfigurationLoader, EnvironmentLoader};
//! use crewkit::conversation::{AgentRole, ConversationStore};
//! use crewkit::orchestration::Orchestrator;
//! use crewkit::provider::{GatewaySettings, ModelGateway};
//! use crewkit::tools::ToolRegistry;
//! use futures_util::StreamExt;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ConfigurationLoader::new(None)?.config;
//! let credentials = Arc::new(EnvironmentLoader::new(None));
//! let gateway = Arc::new(ModelGateway::new(credentials, GatewaySettings::from_config(&config)));
//! let tools = Arc::new(ToolRegistry::with_defaults(&config.tools));
//! let orchestrator =
//!     Orchestrator::from_config(&config, gateway, tools, ConversationStore::shared(), None);
//!
//! orchestrator.add_user_message("Write a function that parses ISO dates").await;
//! let mut events = orchestrator.run_agent(AgentRole::Coder, None);
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod orchestrator;
pub mod questions;

pub use events::{ProtocolEvent, ProtocolStream};
pub use orchestrator::{default_approval, ApprovalCheck, Orchestrator, BRAINSTORM_ORDER};
pub use questions::{detect_questions, has_questions};
