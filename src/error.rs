//! Error taxonomy shared by every layer of the crate.

use thiserror::Error;

/// Result alias used across the gateway, tools and orchestration layers.
pub type CrewResult<T> = std::result::Result<T, CrewError>;

/// Substrings that mark a failure as transient (worth retrying).
const TRANSIENT_MARKERS: &[&str] = &[
    "etimedout",
    "econnreset",
    "econnrefused",
    "enotfound",
    "rate limit",
    "too many requests",
    "429",
    "timeout",
    "timed out",
    "network",
    "connection",
    "overloaded",
    "service unavailable",
    "bad gateway",
];

/// Errors raised by the orchestration core.
///
/// Tool-level failures are normally contained and turned into
/// [`ToolResult`](crate::tools::ToolResult) failures; everything else
/// propagates to the caller of the agent loop.
///
/// # Example
///
/// ```
/// use crewkit::CrewError;
///
/// let error = CrewError::tool("shell", "Command timed out after 30 seconds");
/// assert!(error.to_string().contains("timed out"));
/// assert!(error.is_transient());
/// ```
#[derive(Debug, Clone, Error)]
pub enum CrewError {
    /// Missing or invalid credentials or settings.
    #[error("{0}")]
    Config(String),

    /// The model answered with something unusable.
    #[error("{0}")]
    Llm(String),

    /// A remote call failed.
    #[error("{0}")]
    Api(String),

    /// The circuit breaker rejected the call without attempting it.
    #[error("Circuit breaker is open")]
    CircuitOpen,

    /// A specific tool invocation failed.
    #[error("{message}")]
    Tool {
        /// Name of the tool that failed.
        tool_name: String,
        /// Description of the failure.
        message: String,
    },

    /// A path-specific I/O failure.
    #[error("{message}")]
    FileSystem {
        /// Path the operation was applied to.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// Malformed caller or model input.
    #[error("{0}")]
    Validation(String),

    /// An agent could not run.
    #[error("agent {role}: {message}")]
    Agent {
        /// Role of the agent involved.
        role: String,
        /// Description of the failure.
        message: String,
    },

    /// The consumer stopped listening before the turn completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl CrewError {
    /// Create a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an Llm error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an Api error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    /// Create a Tool error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Create a FileSystem error.
    pub fn file_system(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileSystem {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an Agent error.
    pub fn agent(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Agent {
            role: role.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Llm(_) => "LLM_ERROR",
            Self::Api(_) => "API_ERROR",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::Tool { .. } => "TOOL_ERROR",
            Self::FileSystem { .. } => "FILE_SYSTEM_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Agent { .. } => "AGENT_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Configuration, validation and open-circuit failures never are.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::CircuitOpen | Self::Cancelled => false,
            other => is_transient_message(&other.to_string()),
        }
    }
}

impl From<std::io::Error> for CrewError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

/// Case-insensitive check for network, timeout and rate-limit markers.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker))
}
