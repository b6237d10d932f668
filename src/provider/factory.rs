//! Provider factory for creating completion providers from credentials.
//!
//! Gemini gets its own mapping; every other provider speaks the
//! OpenAI-compatible protocol against its own base URL.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{ApiProvider, CredentialsSource};
use crate::error::{CrewError, CrewResult};
use crate::provider::gemini::GeminiProvider;
use crate::provider::openai::{OpenAiCompatibleProvider, DEFAULT_MAX_TOKENS};
use crate::provider::ModelProvider;

/// Factory for creating completion providers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider for the credentials' selected service.
    ///
    /// Fails with a configuration error when no API key is available or a
    /// custom provider has no base URL.
    pub fn create(credentials: &dyn CredentialsSource) -> CrewResult<Arc<dyn ModelProvider>> {
        Self::create_with_max_tokens(credentials, DEFAULT_MAX_TOKENS)
    }

    /// Same as [`create`](Self::create) with an explicit response token cap.
    pub fn create_with_max_tokens(
        credentials: &dyn CredentialsSource,
        max_tokens: u32,
    ) -> CrewResult<Arc<dyn ModelProvider>> {
        let provider = credentials.api_provider();
        let api_key = credentials.api_key().ok_or_else(|| {
            CrewError::config(format!(
                "API key not configured. Set {} to configure your API key.",
                provider.key_env_var()
            ))
        })?;
        let base_url = credentials.api_base_url().ok_or_else(|| {
            CrewError::config(format!(
                "No base URL configured for provider {}. Set LLM_BASE_URL.",
                provider
            ))
        })?;
        let model = credentials.model();
        let client = Self::http_client()?;

        debug!(provider = %provider, model = %model, base_url = %base_url, "Creating provider");

        let created: Arc<dyn ModelProvider> = match provider {
            ApiProvider::Gemini => Arc::new(
                GeminiProvider::new(client, base_url, api_key, model).with_max_tokens(max_tokens),
            ),
            other => Arc::new(
                OpenAiCompatibleProvider::new(other.as_str(), client, base_url, api_key, model)
                    .with_max_tokens(max_tokens),
            ),
        };
        Ok(created)
    }

    fn http_client() -> CrewResult<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CrewError::config(format!("Failed to build HTTP client: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;

    #[test]
    fn test_missing_key_is_config_error() {
        let creds = StaticCredentials {
            provider: ApiProvider::Anthropic,
            ..Default::default()
        };
        let err = ProviderFactory::create(&creds).err().unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_custom_requires_base_url() {
        let creds = StaticCredentials::new(ApiProvider::Custom, "key");
        let err = ProviderFactory::create(&creds).err().unwrap();
        assert!(err.to_string().contains("LLM_BASE_URL"));
    }

    #[test]
    fn test_selects_mapping_by_provider() {
        let gemini = ProviderFactory::create(&StaticCredentials::new(ApiProvider::Gemini, "k")).unwrap();
        assert_eq!(gemini.provider_name(), "gemini");
        assert_eq!(gemini.default_model(), "gemini-2.0-flash-exp");

        let router = ProviderFactory::create(
            &StaticCredentials::new(ApiProvider::OpenRouter, "k").with_model("openai/gpt-4o-mini"),
        )
        .unwrap();
        assert_eq!(router.provider_name(), "openrouter");
        assert_eq!(router.default_model(), "openai/gpt-4o-mini");
    }
}
