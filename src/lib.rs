pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
mod providers;
pub mod retry;
pub mod server;

pub use client::ChatClient;
pub use config::{ClientConfig, ClientOptions, Provider, ServerConfig};
pub use error::{CodeBotError, Result};
pub use model::{ChatRequest, ChatResponse, GenerateOptions};
