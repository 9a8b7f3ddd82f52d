use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CodeBotError, Result};
use crate::retry::RetryPolicy;

const API_KEY_VARS: [&str; 3] = ["GROK_API_KEY", "XAI_API_KEY", "GROQ_API_KEY"];
const PROVIDER_VAR: &str = "GROK_PROVIDER";
const ENDPOINT_VAR: &str = "GROK_ENDPOINT";
const MODEL_VAR: &str = "GROK_MODEL";
const GROQ_MODEL_VAR: &str = "GROQ_MODEL";
const TIMEOUT_VAR: &str = "GROK_TIMEOUT_SECS";
const BIND_ADDR_VAR: &str = "CODEBOT_BIND_ADDR";

const GROQ_KEY_PREFIX: &str = "gsk_";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BIND_PORT: u16 = 8000;

const XAI_ENDPOINT: &str = "https://api.x.ai/v1/chat/completions";
const XAI_MODEL: &str = "grok-2-latest";
const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const GROQ_FALLBACK_MODELS: &[&str] = &[
    "llama-3.1-8b-instant",
    "llama-3.1-70b-versatile",
    "mixtral-8x7b-32768",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Xai,
    Groq,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xai => "xai",
            Self::Groq => "groq",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Xai => XAI_ENDPOINT,
            Self::Groq => GROQ_ENDPOINT,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Xai => XAI_MODEL,
            Self::Groq => GROQ_MODEL,
        }
    }

    /// Models tried, in order, once the primary model has exhausted its retries.
    pub fn fallback_models(&self) -> &'static [&'static str] {
        match self {
            Self::Xai => &[],
            Self::Groq => GROQ_FALLBACK_MODELS,
        }
    }

    fn detect_from_key(api_key: &str) -> Self {
        if api_key.starts_with(GROQ_KEY_PREFIX) {
            Self::Groq
        } else {
            Self::Xai
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `xai` or `groq` in any letter case, ignoring surrounding whitespace.
impl FromStr for Provider {
    type Err = CodeBotError;

    fn from_str(raw: &str) -> Result<Self> {
        let name = raw.trim();
        if name.eq_ignore_ascii_case("xai") {
            Ok(Self::Xai)
        } else if name.eq_ignore_ascii_case("groq") {
            Ok(Self::Groq)
        } else {
            Err(CodeBotError::configuration(format!(
                "GROK_PROVIDER must be 'xai' or 'groq', case-insensitive (got '{name}')."
            )))
        }
    }
}

/// Explicit constructor overrides. Anything left `None` is resolved from the
/// environment, then from the provider defaults.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub api_key: Option<String>,
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub provider: Provider,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub fallback_models: Vec<String>,
    pub retry: RetryPolicy,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("fallback_models", &self.fallback_models)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_env(options: ClientOptions) -> Result<Self> {
        Self::resolve_with(options, |key| env::var(key).ok())
    }

    pub fn resolve_with(
        options: ClientOptions,
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut lookup = |key: &str| non_empty(get_var(key));

        let api_key = non_empty(options.api_key)
            .or_else(|| API_KEY_VARS.iter().find_map(|key| lookup(*key)))
            .ok_or_else(|| {
                CodeBotError::configuration(
                    "No API key found. Set GROK_API_KEY (or XAI_API_KEY / GROQ_API_KEY) in environment.",
                )
            })?;

        let provider = match non_empty(options.provider).or_else(|| lookup(PROVIDER_VAR)) {
            Some(raw) => raw.parse::<Provider>()?,
            None => Provider::detect_from_key(&api_key),
        };

        let endpoint = non_empty(options.endpoint)
            .or_else(|| lookup(ENDPOINT_VAR))
            .unwrap_or_else(|| provider.default_endpoint().to_string());

        let model = non_empty(options.model)
            .or_else(|| lookup(MODEL_VAR))
            .or_else(|| match provider {
                Provider::Groq => lookup(GROQ_MODEL_VAR),
                Provider::Xai => None,
            })
            .unwrap_or_else(|| provider.default_model().to_string());

        let timeout = options
            .timeout
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or_else(|| {
                Duration::from_secs(parse_timeout_secs(lookup(TIMEOUT_VAR).as_deref()))
            });

        Ok(Self {
            api_key,
            provider,
            endpoint,
            model,
            timeout,
            fallback_models: provider
                .fallback_models()
                .iter()
                .map(|model| (*model).to_string())
                .collect(),
            retry: RetryPolicy::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Self {
        Self {
            bind_addr: parse_bind_addr(get_var(BIND_ADDR_VAR).as_deref()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_timeout_secs(raw: Option<&str>) -> u64 {
    parse_positive_u64(raw, DEFAULT_TIMEOUT_SECS)
}

fn parse_bind_addr(raw: Option<&str>) -> SocketAddr {
    raw.and_then(|value| value.trim().parse::<SocketAddr>().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], DEFAULT_BIND_PORT)))
}
