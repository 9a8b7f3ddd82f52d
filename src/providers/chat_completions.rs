use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

use crate::config::{ClientConfig, Provider};
use crate::error::{CodeBotError, Result};
use crate::model::{ChatRequest, ChatResponse};
use crate::providers::http_errors::describe_request_error;

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatRequest> for ChatCompletionBody<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: request
                .messages()
                .into_iter()
                .map(|(role, content)| ChatMessage {
                    role: role.as_str(),
                    content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

/// Why a single HTTP attempt did not produce a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptFailure {
    Transport(String),
    ServerStatus { status: StatusCode, body: String },
    ClientStatus { status: StatusCode, body: String },
}

impl AttemptFailure {
    /// 4xx answers are final; everything else may succeed on another try.
    pub(crate) fn is_retryable(&self) -> bool {
        !matches!(self, Self::ClientStatus { .. })
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => f.write_str(message),
            Self::ServerStatus { status, body } => write!(f, "Server {status}: {body}"),
            Self::ClientStatus { status, body } => write!(f, "Client error {status}: {body}"),
        }
    }
}

/// Issues one chat-completion POST and returns the raw body of a non-error answer.
pub(crate) async fn send(
    client: &Client,
    cfg: &ClientConfig,
    request: &ChatRequest,
) -> std::result::Result<String, AttemptFailure> {
    let body = ChatCompletionBody::from(request);
    debug!(
        endpoint = %cfg.endpoint,
        provider = %cfg.provider,
        model = %request.model,
        max_tokens = ?request.max_tokens,
        "sending chat completion request"
    );

    let response = client
        .post(&cfg.endpoint)
        .bearer_auth(&cfg.api_key)
        .header("x-api-key", &cfg.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(
                endpoint = %cfg.endpoint,
                model = %request.model,
                error = %err,
                "chat completion request failed"
            );
            AttemptFailure::Transport(describe_request_error(&err, &cfg.endpoint, cfg.timeout))
        })?;

    let status = response.status();
    let response_body = response.text().await.map_err(|err| {
        AttemptFailure::Transport(describe_request_error(&err, &cfg.endpoint, cfg.timeout))
    })?;

    if status.is_server_error() {
        return Err(AttemptFailure::ServerStatus {
            status,
            body: response_body,
        });
    }
    if status.is_client_error() {
        return Err(AttemptFailure::ClientStatus {
            status,
            body: response_body,
        });
    }

    debug!(
        model = %request.model,
        status = %status,
        response_body_len = response_body.len(),
        "received chat completion response"
    );
    Ok(response_body)
}

/// Pulls `choices[0].message.content` out of a completion payload.
pub(crate) fn parse_completion(provider: Provider, body: &str) -> Result<ChatResponse> {
    let payload: Value = serde_json::from_str(body).map_err(|err| {
        CodeBotError::protocol(
            provider,
            format!("Chat API returned a body that is not valid JSON: {err}"),
        )
    })?;

    let first_choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| {
            CodeBotError::protocol(
                provider,
                format!("Chat API returned no choices. Raw: {payload}"),
            )
        })?;

    let message = first_choice
        .get("message")
        .filter(|message| message.is_object())
        .ok_or_else(|| {
            CodeBotError::protocol(provider, "Chat API response choice has no message.")
        })?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| CodeBotError::protocol(provider, "Chat API response missing content."))?;

    Ok(ChatResponse {
        content: content.to_string(),
    })
}
