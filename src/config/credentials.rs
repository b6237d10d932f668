//! Provider table and the credentials contract consumed by the gateway.

use std::fmt;
use std::str::FromStr;

use crate::error::CrewError;

/// Remote completion services the gateway knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApiProvider {
    /// OpenAI chat completions.
    #[default]
    OpenAi,
    /// Anthropic through its OpenAI-compatible endpoint.
    Anthropic,
    /// OpenRouter aggregation service.
    OpenRouter,
    /// Google Gemini generateContent API.
    Gemini,
    /// Any OpenAI-compatible endpoint.
    Custom,
}

impl ApiProvider {
    /// Every provider, in key-resolution order.
    pub const ALL: [ApiProvider; 5] = [
        ApiProvider::OpenAi,
        ApiProvider::Anthropic,
        ApiProvider::OpenRouter,
        ApiProvider::Gemini,
        ApiProvider::Custom,
    ];

    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::OpenAi => "openai",
            ApiProvider::Anthropic => "anthropic",
            ApiProvider::OpenRouter => "openrouter",
            ApiProvider::Gemini => "gemini",
            ApiProvider::Custom => "custom",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ApiProvider::OpenAi => "OpenAI",
            ApiProvider::Anthropic => "Anthropic",
            ApiProvider::OpenRouter => "OpenRouter",
            ApiProvider::Gemini => "Google Gemini",
            ApiProvider::Custom => "Custom",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn key_env_var(&self) -> &'static str {
        match self {
            ApiProvider::OpenAi => "OPENAI_API_KEY",
            ApiProvider::Anthropic => "ANTHROPIC_API_KEY",
            ApiProvider::OpenRouter => "OPENROUTER_API_KEY",
            ApiProvider::Gemini => "GEMINI_API_KEY",
            ApiProvider::Custom => "API_KEY",
        }
    }

    /// Base URL used when none is configured.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ApiProvider::OpenAi => Some("https://api.openai.com/v1"),
            ApiProvider::Anthropic => Some("https://api.anthropic.com/v1"),
            ApiProvider::OpenRouter => Some("https://openrouter.ai/api/v1"),
            ApiProvider::Gemini => Some("https://generativelanguage.googleapis.com/v1beta"),
            ApiProvider::Custom => None,
        }
    }

    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            ApiProvider::OpenAi | ApiProvider::Custom => "gpt-4o",
            ApiProvider::Anthropic => "claude-3-5-sonnet-20241022",
            ApiProvider::OpenRouter => "openai/gpt-4o",
            ApiProvider::Gemini => "gemini-2.0-flash-exp",
        }
    }
}

impl fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiProvider {
    type Err = CrewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ApiProvider::OpenAi),
            "anthropic" => Ok(ApiProvider::Anthropic),
            "openrouter" => Ok(ApiProvider::OpenRouter),
            "gemini" | "google" => Ok(ApiProvider::Gemini),
            "custom" => Ok(ApiProvider::Custom),
            other => Err(CrewError::config(format!("Unknown API provider: {}", other))),
        }
    }
}

/// Read-only source of credentials and model selection.
///
/// Values are read on every call so that a gateway reset picks up changes.
pub trait CredentialsSource: Send + Sync {
    /// API key, if one is configured.
    fn api_key(&self) -> Option<String>;
    /// Selected provider.
    fn api_provider(&self) -> ApiProvider;
    /// Endpoint override, falling back to the provider default.
    fn api_base_url(&self) -> Option<String>;
    /// Model identifier.
    fn model(&self) -> String;
}

/// Fixed credentials, for programmatic setups and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    pub api_key: Option<String>,
    pub provider: ApiProvider,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl StaticCredentials {
    /// Credentials for `provider` using its default endpoint and model.
    pub fn new(provider: ApiProvider, api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            provider,
            base_url: None,
            model: None,
        }
    }

    /// Override the endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl CredentialsSource for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.trim().is_empty())
    }

    fn api_provider(&self) -> ApiProvider {
        self.provider
    }

    fn api_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(str::to_string))
    }

    fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }
}
