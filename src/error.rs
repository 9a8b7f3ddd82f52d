use thiserror::Error;

use crate::config::Provider;

/// Errors surfaced by the chat client.
#[derive(Debug, Error)]
pub enum CodeBotError {
    /// Missing API key, unknown provider, or an HTTP client that could not be built.
    #[error("{0}")]
    Configuration(String),

    /// The provider could not be reached, or kept failing, for the reported model.
    #[error(
        "Chat API request failed for model '{model}' after {attempts} attempt(s) (provider={provider}): {message}"
    )]
    Request {
        provider: Provider,
        model: String,
        attempts: u32,
        message: String,
    },

    /// The provider answered, but not with a usable completion.
    #[error("{message} (provider={provider})")]
    Protocol { provider: Provider, message: String },
}

impl CodeBotError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn protocol(provider: Provider, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider,
            message: message.into(),
        }
    }

    /// Model named by a request failure, if this is one.
    pub fn failed_model(&self) -> Option<&str> {
        match self {
            Self::Request { model, .. } => Some(model.as_str()),
            _ => None,
        }
    }
}

pub type Result<T, E = CodeBotError> = std::result::Result<T, E>;
