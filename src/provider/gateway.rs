//! Model gateway: the single entry point agents use to reach a model.
//!
//! Every remote call goes through three layers, outermost first: the retry
//! loop, the circuit breaker, then a wall-clock timeout around the one
//! attempt. Provider clients are created lazily from the credentials source
//! and cached until [`ModelGateway::reset_client`] is called.

use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Configuration, CredentialsSource, RetryConfig};
use crate::error::{CrewError, CrewResult};
use crate::provider::factory::ProviderFactory;
use crate::provider::traits::{ChatStream, ModelProvider};
use crate::provider::types::{ChatMessage, ChatOptions, ChatResponse, ModelInfo, StreamChunk, ToolCall};
use crate::resilience::{retry, CircuitBreaker, CircuitBreakerConfig, RetryOptions};

/// Retry, breaker and timeout settings for a [`ModelGateway`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Retry schedule for `chat` and stream establishment.
    pub chat_retry: RetryOptions<CrewError>,
    /// Retry schedule for `fetch_models`.
    pub models_retry: RetryOptions<CrewError>,
    /// Breaker shared by all calls of one gateway.
    pub breaker: CircuitBreakerConfig,
    /// Wall-clock cap for one attempt, and for the gap between two
    /// streamed items.
    pub request_timeout: Duration,
    /// Response token cap handed to providers built by the gateway.
    pub max_tokens: u32,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&Configuration::default())
    }
}

impl GatewaySettings {
    /// Build settings from the `[resilience]` and `[execution]` sections.
    pub fn from_config(config: &Configuration) -> Self {
        let resilience = &config.resilience;
        Self {
            chat_retry: retry_options(&resilience.chat),
            models_retry: retry_options(&resilience.models),
            breaker: CircuitBreakerConfig::default()
                .with_failure_threshold(resilience.failure_threshold)
                .with_recovery_timeout(Duration::from_secs(resilience.recovery_timeout_seconds)),
            request_timeout: Duration::from_secs(config.execution.request_timeout_seconds),
            max_tokens: config.execution.max_tokens,
        }
    }

    /// Override the per-attempt timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn retry_options(config: &RetryConfig) -> RetryOptions<CrewError> {
    RetryOptions::new(
        config.max_attempts,
        Duration::from_millis(config.base_delay_ms),
        Duration::from_millis(config.max_delay_ms),
    )
    .with_backoff_factor(config.backoff_factor)
    .with_retryable(CrewError::is_transient)
}

enum ProviderSource {
    Credentials(Arc<dyn CredentialsSource>),
    Fixed(Arc<dyn ModelProvider>),
}

/// Normalized, resilient access to a completion provider.
///
/// # Example
///
/// ```no_run
/// use crewkit::config::EnvironmentLoader;
/// use crewkit::provider::{ChatMessage, ChatOptions, GatewaySettings, ModelGateway};
/// use std::sync::Arc;
///
/// # async fn run() -> crewkit::CrewResult<()> {
/// let gateway = ModelGateway::new(Arc::new(EnvironmentLoader::new(None)), GatewaySettings::default());
/// let response = gateway
///     .chat(&[ChatMessage::user("Say hello")], &ChatOptions::new())
///     .await?;
/// println!("{}", response.content);
/// # Ok(())
/// # }
/// ```
pub struct ModelGateway {
    source: ProviderSource,
    settings: GatewaySettings,
    breaker: CircuitBreaker,
    client: Mutex<Option<Arc<dyn ModelProvider>>>,
}

impl ModelGateway {
    /// Gateway that builds its provider from `credentials` on first use.
    pub fn new(credentials: Arc<dyn CredentialsSource>, settings: GatewaySettings) -> Self {
        let breaker = CircuitBreaker::new("model-gateway", settings.breaker.clone());
        Self {
            source: ProviderSource::Credentials(credentials),
            settings,
            breaker,
            client: Mutex::new(None),
        }
    }

    /// Gateway bound to an already-constructed provider.
    pub fn with_provider(provider: Arc<dyn ModelProvider>, settings: GatewaySettings) -> Self {
        let breaker = CircuitBreaker::new("model-gateway", settings.breaker.clone());
        Self {
            source: ProviderSource::Fixed(provider),
            settings,
            breaker,
            client: Mutex::new(None),
        }
    }

    /// Settings in effect.
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// The breaker guarding this gateway's calls.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Drop the cached provider client so the next call rebuilds it from
    /// the current credentials.
    pub fn reset_client(&self) {
        let mut cached = self.client.lock().unwrap_or_else(|e| e.into_inner());
        if cached.take().is_some() {
            info!("Model client reset");
        }
    }

    fn provider(&self) -> CrewResult<Arc<dyn ModelProvider>> {
        match &self.source {
            ProviderSource::Fixed(provider) => Ok(Arc::clone(provider)),
            ProviderSource::Credentials(credentials) => {
                let mut cached = self.client.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(provider) = cached.as_ref() {
                    return Ok(Arc::clone(provider));
                }
                let provider =
                    ProviderFactory::create_with_max_tokens(credentials.as_ref(), self.settings.max_tokens)?;
                debug!(provider = provider.provider_name(), "Model client created");
                *cached = Some(Arc::clone(&provider));
                Ok(provider)
            }
        }
    }

    async fn timed<T, Fut>(&self, attempt: Fut) -> CrewResult<T>
    where
        Fut: Future<Output = CrewResult<T>>,
    {
        match tokio::time::timeout(self.settings.request_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(CrewError::api(format!(
                "Request timed out after {}s",
                self.settings.request_timeout.as_secs()
            ))),
        }
    }

    /// Single-shot completion.
    pub async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> CrewResult<ChatResponse> {
        options.validate()?;
        let provider = self.provider()?;
        let provider = provider.as_ref();

        let outcome = retry(
            || async move {
                self.breaker
                    .execute(|| self.timed(provider.chat(messages, options)))
                    .await
            },
            &self.settings.chat_retry,
        )
        .await;

        if !outcome.is_success() {
            warn!(attempts = outcome.attempts, "Chat request failed");
        }
        outcome.into_result()
    }

    /// Streamed completion.
    ///
    /// Text fragments are forwarded as they arrive. Tool calls reported by
    /// the provider are held back and emitted as one trailing item, so all
    /// text of the turn precedes them.
    pub async fn stream_chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> CrewResult<ChatStream> {
        options.validate()?;
        let provider = self.provider()?;
        let provider = provider.as_ref();

        let outcome = retry(
            || async move {
                self.breaker
                    .execute(|| self.timed(provider.chat_stream(messages, options)))
                    .await
            },
            &self.settings.chat_retry,
        )
        .await;

        let inner = outcome.into_result()?;
        Ok(normalize_stream(inner, self.settings.request_timeout))
    }

    /// Models available to the configured credentials, sorted by id.
    pub async fn fetch_models(&self) -> CrewResult<Vec<ModelInfo>> {
        let provider = self.provider()?;
        let provider = provider.as_ref();

        let outcome = retry(
            || async move { self.breaker.execute(|| self.timed(provider.list_models())).await },
            &self.settings.models_retry,
        )
        .await;

        let mut models = outcome.into_result().map_err(|err| match err {
            CrewError::Config(_) | CrewError::CircuitOpen => err,
            other => CrewError::api(format!("Failed to fetch models: {}", other)),
        })?;
        models.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(models)
    }
}

struct NormalizeState {
    inner: ChatStream,
    pending: Vec<ToolCall>,
    idle_timeout: Duration,
    done: bool,
}

fn normalize_stream(inner: ChatStream, idle_timeout: Duration) -> ChatStream {
    let state = NormalizeState {
        inner,
        pending: Vec::new(),
        idle_timeout,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            let next = match tokio::time::timeout(state.idle_timeout, state.inner.next()).await {
                Ok(next) => next,
                Err(_) => {
                    state.done = true;
                    let err = CrewError::api(format!(
                        "Stream stalled for {}s",
                        state.idle_timeout.as_secs()
                    ));
                    return Some((Err(err), state));
                }
            };
            match next {
                Some(Ok(StreamChunk::Text(text))) => {
                    if text.is_empty() {
                        continue;
                    }
                    return Some((Ok(StreamChunk::Text(text)), state));
                }
                Some(Ok(StreamChunk::ToolCalls(calls))) => state.pending.extend(calls),
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.done = true;
                    if state.pending.is_empty() {
                        return None;
                    }
                    let calls = std::mem::take(&mut state.pending);
                    return Some((Ok(StreamChunk::ToolCalls(calls)), state));
                }
            }
        }
    }))
}
