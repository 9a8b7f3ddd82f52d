pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are an expert coding assistant. Return only executable code unless told otherwise.";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

/// Per-call knobs for [`ChatClient::generate_code`](crate::ChatClient::generate_code).
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub system_message: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system_message: String,
    pub user_message: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        options: &GenerateOptions,
    ) -> Self {
        Self {
            model: model.into(),
            system_message: options.system_message.clone(),
            user_message: prompt.into(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }

    /// Same request, addressed to another model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn messages(&self) -> [(MessageRole, &str); 2] {
        [
            (MessageRole::System, self.system_message.as_str()),
            (MessageRole::User, self.user_message.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
}
