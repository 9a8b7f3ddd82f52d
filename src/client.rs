use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, ClientOptions};
use crate::error::{CodeBotError, Result};
use crate::model::{ChatRequest, ChatResponse, GenerateOptions};
use crate::providers::chat_completions::{self, AttemptFailure};
use crate::retry::{Sleeper, TokioSleeper};

/// Chat-completion client with per-model retries and provider-level model fallback.
///
/// The configuration is fixed at construction. Each call runs its attempts one
/// after another; nothing is shared between calls except the config and the
/// pooled HTTP client.
pub struct ChatClient<S = TokioSleeper> {
    http: Client,
    config: ClientConfig,
    sleeper: S,
}

impl ChatClient<TokioSleeper> {
    /// Resolves the config from `options`, then the process environment, then defaults.
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::from_config(ClientConfig::from_env(options)?)
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::default())
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::with_sleeper(config, TokioSleeper)
    }
}

impl<S> ChatClient<S>
where
    S: Sleeper,
{
    pub fn with_sleeper(config: ClientConfig, sleeper: S) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                CodeBotError::configuration(format!("Failed to initialize HTTP client: {err}"))
            })?;

        Ok(Self {
            http,
            config,
            sleeper,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Asks the configured model for code and returns the assistant's text.
    pub async fn generate_code(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let request = ChatRequest::new(self.config.model.as_str(), prompt, options);
        let response = self.complete(&request).await?;
        Ok(response.content)
    }

    /// Sends `request`, retrying and falling back as needed, and parses the reply.
    ///
    /// A reply that arrives but cannot be parsed is not retried and does not
    /// trigger fallback.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = self.attempt_with_fallbacks(request).await?;
        let response = chat_completions::parse_completion(self.config.provider, &body)?;
        debug!(
            provider = %self.config.provider,
            response_len = response.content.len(),
            "parsed chat completion"
        );
        Ok(response)
    }

    async fn attempt_with_fallbacks(&self, request: &ChatRequest) -> Result<String> {
        let first_err = match self.attempt_with_retry(request).await {
            Ok(body) => return Ok(body),
            Err(err) => err,
        };

        if self.config.fallback_models.is_empty() {
            return Err(first_err);
        }

        warn!(
            provider = %self.config.provider,
            model = %request.model,
            error = %first_err,
            "primary model failed; trying fallback models"
        );

        for fallback_model in self
            .config
            .fallback_models
            .iter()
            .filter(|model| **model != request.model)
        {
            let fallback_request = request.with_model(fallback_model.as_str());
            match self.attempt_with_retry(&fallback_request).await {
                Ok(body) => {
                    info!(
                        provider = %self.config.provider,
                        model = %fallback_model,
                        "fallback model succeeded"
                    );
                    return Ok(body);
                }
                Err(err) => {
                    warn!(
                        provider = %self.config.provider,
                        model = %fallback_model,
                        error = %err,
                        "fallback model failed"
                    );
                }
            }
        }

        Err(first_err)
    }

    async fn attempt_with_retry(&self, request: &ChatRequest) -> Result<String> {
        let policy = &self.config.retry;
        let max_attempts = policy.attempts();
        let mut backoff = policy.initial_backoff;
        let mut last_failure = None;

        for attempt in 1..=max_attempts {
            match chat_completions::send(&self.http, &self.config, request).await {
                Ok(body) => return Ok(body),
                Err(failure) if failure.is_retryable() => {
                    warn!(
                        provider = %self.config.provider,
                        model = %request.model,
                        attempt,
                        max_attempts,
                        backoff_secs = backoff.as_secs_f64(),
                        error = %failure,
                        "retryable chat API failure"
                    );
                    last_failure = Some(failure);
                    self.sleeper.sleep(backoff).await;
                    backoff = policy.next_backoff(backoff);
                }
                Err(failure) => {
                    warn!(
                        provider = %self.config.provider,
                        model = %request.model,
                        attempt,
                        error = %failure,
                        "chat API rejected request"
                    );
                    return Err(self.request_error(request, attempt, &failure));
                }
            }
        }

        let failure = last_failure
            .unwrap_or_else(|| AttemptFailure::Transport("no attempt was made".to_string()));
        Err(self.request_error(request, max_attempts, &failure))
    }

    fn request_error(
        &self,
        request: &ChatRequest,
        attempts: u32,
        failure: &AttemptFailure,
    ) -> CodeBotError {
        CodeBotError::Request {
            provider: self.config.provider,
            model: request.model.clone(),
            attempts,
            message: failure.to_string(),
        }
    }
}
