//! Environment variable loading and management.
//!
//! Provider selection and API keys come from the process environment,
//! optionally seeded from a `.env` file. TOML `[llm]` overrides win over
//! the environment for provider, model and base URL.

use std::env;
use std::path::Path;

use super::config::LlmConfig;
use super::credentials::{ApiProvider, CredentialsSource};

/// Loads environment variables from .env file and system environment.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentLoader {
    env_file: Option<String>,
    overrides: LlmConfig,
}

impl EnvironmentLoader {
    /// Initialize the environment loader.
    ///
    /// # Arguments
    /// * `env_file` - Path to .env file. Only an explicitly given file is loaded.
    pub fn new(env_file: Option<&Path>) -> Self {
        if let Some(path) = env_file {
            if path.exists() {
                if let Err(e) = dotenv::from_path(path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to load .env file");
                }
            }
        }

        Self {
            env_file: env_file.map(|p| p.to_string_lossy().to_string()),
            overrides: LlmConfig::default(),
        }
    }

    /// Apply `[llm]` overrides from the TOML configuration.
    pub fn with_llm_config(mut self, llm: Option<&LlmConfig>) -> Self {
        if let Some(llm) = llm {
            self.overrides = llm.clone();
        }
        self
    }

    /// The `.env` file this loader was created with.
    pub fn env_file(&self) -> Option<&str> {
        self.env_file.as_deref()
    }

    /// Raw LLM provider selection (`LLM_PROVIDER`).
    pub fn llm_provider(&self) -> Option<String> {
        self.overrides
            .provider
            .clone()
            .or_else(|| read_var("LLM_PROVIDER"))
    }
}

impl CredentialsSource for EnvironmentLoader {
    fn api_key(&self) -> Option<String> {
        let selected = self.api_provider();
        read_var(selected.key_env_var()).or_else(|| {
            ApiProvider::ALL
                .iter()
                .filter(|p| **p != selected)
                .find_map(|p| read_var(p.key_env_var()))
        })
    }

    fn api_provider(&self) -> ApiProvider {
        match self.llm_provider() {
            Some(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!(provider = %name, "Unknown LLM_PROVIDER, using openai");
                ApiProvider::OpenAi
            }),
            None => ApiProvider::OpenAi,
        }
    }

    fn api_base_url(&self) -> Option<String> {
        self.overrides
            .base_url
            .clone()
            .or_else(|| read_var("LLM_BASE_URL"))
            .or_else(|| self.api_provider().default_base_url().map(str::to_string))
    }

    fn model(&self) -> String {
        self.overrides
            .model
            .clone()
            .or_else(|| read_var("LLM_MODEL"))
            .unwrap_or_else(|| self.api_provider().default_model().to_string())
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Everything touching process-wide variables lives in one test so the
    // assertions cannot interleave with each other.
    #[test]
    fn test_environment_resolution() {
        for var in ["LLM_PROVIDER", "LLM_MODEL", "LLM_BASE_URL"] {
            env::remove_var(var);
        }
        for provider in ApiProvider::ALL {
            env::remove_var(provider.key_env_var());
        }

        let loader = EnvironmentLoader::default();
        assert_eq!(loader.api_provider(), ApiProvider::OpenAi);
        assert_eq!(loader.model(), "gpt-4o");
        assert!(loader.api_key().is_none());

        env::set_var("LLM_PROVIDER", "openrouter");
        env::set_var("GEMINI_API_KEY", "gem-key");
        assert_eq!(loader.api_provider(), ApiProvider::OpenRouter);
        assert_eq!(loader.api_key().as_deref(), Some("gem-key"));
        assert_eq!(
            loader.api_base_url().as_deref(),
            Some("https://openrouter.ai/api/v1")
        );

        env::set_var("OPENROUTER_API_KEY", "router-key");
        assert_eq!(loader.api_key().as_deref(), Some("router-key"));

        let overridden = EnvironmentLoader::default().with_llm_config(Some(&LlmConfig {
            provider: Some("custom".to_string()),
            model: Some("local".to_string()),
            base_url: Some("http://localhost:1234/v1".to_string()),
        }));
        assert_eq!(overridden.api_provider(), ApiProvider::Custom);
        assert_eq!(overridden.model(), "local");
        assert_eq!(
            overridden.api_base_url().as_deref(),
            Some("http://localhost:1234/v1")
        );

        for var in ["LLM_PROVIDER", "GEMINI_API_KEY", "OPENROUTER_API_KEY"] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_env_file_loading() {
        let env_loader = EnvironmentLoader::new(None);
        assert!(env_loader.env_file().is_none());
    }

    #[test]
    fn test_explicit_env_file_is_loaded() {
        use std::fs;
        use tempfile::NamedTempFile;

        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "CREWKIT_TEST_ENV_MARKER=loaded\n").unwrap();

        let loader = EnvironmentLoader::new(Some(file.path()));
        assert!(loader.env_file().is_some());
        assert_eq!(env::var("CREWKIT_TEST_ENV_MARKER").unwrap(), "loaded");
    }
}
