//! Configuration management.
//!
//! TOML settings for the orchestrator, agent loop, resilience layer and
//! tools, plus the environment-backed [`CredentialsSource`] the model
//! gateway reads API keys and provider selection from.
//!
//! # Example
//!
//! ```no_run
//! use crewkit::config::{ConfigurationLoader, CredentialsSource, EnvironmentLoader};
//! use std::path::Path;
//!
//! let loader = ConfigurationLoader::new(Some(Path::new("config/crewkit.toml"))).unwrap();
//! let env = EnvironmentLoader::new(None).with_llm_config(loader.config.llm.as_ref());
//!
//! println!("Max review cycles: {}", loader.config.orchestrator.max_review_cycles);
//! println!("Provider: {}", env.api_provider());
//! ```

pub mod config;
pub mod credentials;
pub mod environment;

// Re-export main types for convenience
pub use self::config::{
    AgentConfig, Configuration, ConfigurationLoader, ExecutionConfig, LlmConfig, LoggingConfig,
    OrchestratorConfig, ResilienceConfig, RetryConfig, ToolsConfig,
};
pub use self::credentials::{ApiProvider, CredentialsSource, StaticCredentials};
pub use self::environment::EnvironmentLoader;
