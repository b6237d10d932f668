//! Crew Kit - multi-agent LLM orchestration core
//!
//! A crew of LLM-backed personas (Coder, Critic, Debugger, Architect, End
//! User, Questioner) share one conversation, call a remote model through a
//! resilient gateway and run tools on the model's behalf. The crate is
//! split into feature-gated modules:
//!
//! - **`config`** - TOML settings and environment credentials
//! - **`observability`** - `tracing` setup and the markdown transcript logger
//! - **`conversation`** - the append-only shared conversation
//! - **`resilience`** - retry with backoff and the circuit breaker
//! - **`provider`** - provider mappings and the model gateway
//! - **`executor`** - validated shell command execution
//! - **`tools`** - the tool registry and the built-in file and shell tools
//! - **`agent`** - personas and the streaming agent loop
//! - **`orchestration`** - review cycles, brainstorms and question hand-off
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! crewkit = { version = "0.3", features = ["tools"] }
//! # Or enable everything:
//! crewkit = { version = "0.3", features = ["all"] }
//! ```
//!
//! # Example: a review cycle
//!
//! ```no_run
//! use crewkit::prelude::*;
//! use futures_util::StreamExt;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ConfigurationLoader::new(None)?.config;
//! let gateway = Arc::new(ModelGateway::new(
//!     Arc::new(EnvironmentLoader::new(None)),
//!     GatewaySettings::from_config(&config),
//! ));
//! let tools = Arc::new(ToolRegistry::with_defaults(&config.tools));
//! let crew = Orchestrator::from_config(&config, gateway, tools, ConversationStore::shared(), None);
//!
//! crew.add_user_message("Add input validation to src/parse.rs").await;
//! let mut review = crew.run_review_cycle();
//! while let Some(event) = review.next().await {
//!     if let ProtocolEvent::Complete { role, approved, .. } = event? {
//!         println!("{} finished (approved: {:?})", role, approved);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example: question detection
//!
//! ```
//! use crewkit::orchestration::{detect_questions, has_questions};
//!
//! assert!(has_questions("Should we cache the results"));
//! assert_eq!(detect_questions("Done. What about logging?"), vec!["What about logging?"]);
//! ```

#![warn(missing_docs)]

/// Error taxonomy shared by every module
pub mod error;

pub use error::{CrewError, CrewResult};

/// Configuration management (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Observability utilities (enabled with the `observability` feature)
#[cfg(feature = "observability")]
pub mod observability;

/// Shared conversation state (enabled with the `conversation` feature)
#[cfg(feature = "conversation")]
pub mod conversation;

/// Retry and circuit breaking (enabled with the `resilience` feature)
#[cfg(feature = "resilience")]
pub mod resilience;

/// LLM provider abstraction and gateway (enabled with the `provider` feature)
#[cfg(feature = "provider")]
pub mod provider;

/// Shell command execution (enabled with the `executor` feature)
#[cfg(feature = "executor")]
pub mod executor;

/// Tool registry and built-in tools (enabled with the `tools` feature)
#[cfg(feature = "tools")]
pub mod tools;

/// Agent implementation (enabled with the `agent` feature)
#[cfg(feature = "agent")]
pub mod agent;

/// Agent orchestration (enabled with the `orchestration` feature)
#[cfg(feature = "orchestration")]
pub mod orchestration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{CrewError, CrewResult};

    #[cfg(feature = "config")]
    pub use crate::config::{Configuration, ConfigurationLoader, CredentialsSource, EnvironmentLoader};

    #[cfg(feature = "observability")]
    pub use crate::observability::{init_tracing, Logger};

    #[cfg(feature = "conversation")]
    pub use crate::conversation::{AgentRole, ConversationStore, Message, SharedConversation};

    #[cfg(feature = "resilience")]
    pub use crate::resilience::{CircuitBreaker, CircuitState, RetryOptions};

    #[cfg(feature = "provider")]
    pub use crate::provider::{
        ChatMessage, ChatOptions, GatewaySettings, ModelGateway, ModelProvider, StreamChunk, ToolCall,
    };

    #[cfg(feature = "tools")]
    pub use crate::tools::{Tool, ToolRegistry, ToolResult};

    #[cfg(feature = "agent")]
    pub use crate::agent::{Agent, AgentEvent, ChatAgent, Persona};

    #[cfg(feature = "orchestration")]
    pub use crate::orchestration::{detect_questions, has_questions, Orchestrator, ProtocolEvent};
}
