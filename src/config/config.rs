//! TOML configuration parsing and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub agent: AgentConfig,
    pub orchestrator: OrchestratorConfig,
    pub execution: ExecutionConfig,
    pub resilience: ResilienceConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
    pub llm: Option<LlmConfig>,
}

/// Identity of the application embedding the crate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub version: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "crewkit".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Cross-agent protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Critic passes before approval is forced.
    pub max_review_cycles: u32,
    /// Role identifiers the orchestrator may run.
    pub enabled_agents: Vec<String>,
    /// Route detected questions to the questioner automatically.
    pub auto_answer_questions: bool,
    /// How many nested hand-offs one turn may trigger.
    pub max_handoff_depth: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_review_cycles: 3,
            enabled_agents: ["coder", "critic", "debugger", "architect", "enduser", "questioner"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            auto_answer_questions: true,
            max_handoff_depth: 1,
        }
    }
}

/// Agent loop and request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Model turns one agent loop may take.
    pub max_iterations: u32,
    /// Wall-clock limit for a single gateway attempt.
    pub request_timeout_seconds: u64,
    /// Response token cap sent to the model.
    pub max_tokens: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            request_timeout_seconds: 120,
            max_tokens: 4000,
        }
    }
}

/// Backoff schedule for one class of remote call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_backoff_factor() -> f64 {
    2.0
}

/// Retry and circuit breaker settings for the model gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub chat: RetryConfig,
    pub models: RetryConfig,
    pub failure_threshold: u32,
    pub recovery_timeout_seconds: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            chat: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1000,
                max_delay_ms: 15_000,
                backoff_factor: 2.0,
            },
            models: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 2000,
                max_delay_ms: 10_000,
                backoff_factor: 2.0,
            },
            failure_threshold: 3,
            recovery_timeout_seconds: 30,
        }
    }
}

/// Built-in tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Directory relative paths resolve against. Defaults to the process cwd.
    pub working_dir: Option<String>,
    pub shell_timeout_seconds: u64,
    pub max_output_bytes: usize,
    pub list_max_depth: usize,
    pub excluded_dirs: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            shell_timeout_seconds: 30,
            max_output_bytes: 1024 * 1024,
            list_max_depth: 3,
            excluded_dirs: ["node_modules", "target", "__pycache__", "venv", "dist", "build"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Transcript logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Markdown transcript path. A temp file is used when absent.
    pub log_file: Option<String>,
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            log_level: "INFO".to_string(),
        }
    }
}

/// Overrides for provider selection; credentials themselves stay in the environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Loads and manages TOML configuration.
#[derive(Debug)]
pub struct ConfigurationLoader {
    pub config_path: PathBuf,
    pub config: Configuration,
}

impl ConfigurationLoader {
    /// Initialize configuration loader.
    ///
    /// # Arguments
    /// * `config_path` - Path to TOML config file. If None, `config/crewkit.toml`
    ///   is tried and defaults are used when it does not exist.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config_path = config_path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("config/crewkit.toml"));

        let config = if config_path.exists() {
            Self::load_config(&config_path)?
        } else {
            Configuration::default()
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Create a configuration loader from a pre-built Configuration.
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config_path: PathBuf::from("config/crewkit.toml"),
            config,
        }
    }

    /// Load configuration from TOML file.
    fn load_config(path: &Path) -> Result<Configuration> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Get configuration value by dot-notation key.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match key {
            "agent.name" => Some(self.config.agent.name.clone()),
            "agent.version" => Some(self.config.agent.version.clone()),
            "logging.log_file" => self.config.logging.log_file.clone(),
            "logging.log_level" => Some(self.config.logging.log_level.clone()),
            "tools.working_dir" => self.config.tools.working_dir.clone(),
            "llm.provider" => self.config.llm.as_ref().and_then(|l| l.provider.clone()),
            "llm.model" => self.config.llm.as_ref().and_then(|l| l.model.clone()),
            "llm.base_url" => self.config.llm.as_ref().and_then(|l| l.base_url.clone()),
            _ => None,
        }
    }

    /// Get numeric configuration value.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let c = &self.config;
        match key {
            "orchestrator.max_review_cycles" => Some(c.orchestrator.max_review_cycles as u64),
            "orchestrator.max_handoff_depth" => Some(c.orchestrator.max_handoff_depth as u64),
            "execution.max_iterations" => Some(c.execution.max_iterations as u64),
            "execution.request_timeout_seconds" => Some(c.execution.request_timeout_seconds),
            "execution.max_tokens" => Some(c.execution.max_tokens as u64),
            "resilience.failure_threshold" => Some(c.resilience.failure_threshold as u64),
            "resilience.recovery_timeout_seconds" => Some(c.resilience.recovery_timeout_seconds),
            "resilience.chat.max_attempts" => Some(c.resilience.chat.max_attempts as u64),
            "resilience.models.max_attempts" => Some(c.resilience.models.max_attempts as u64),
            "tools.shell_timeout_seconds" => Some(c.tools.shell_timeout_seconds),
            "tools.max_output_bytes" => Some(c.tools.max_output_bytes as u64),
            "tools.list_max_depth" => Some(c.tools.list_max_depth as u64),
            _ => None,
        }
    }

    /// Get boolean configuration value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match key {
            "orchestrator.auto_answer_questions" => {
                Some(self.config.orchestrator.auto_answer_questions)
            }
            _ => None,
        }
    }
}
