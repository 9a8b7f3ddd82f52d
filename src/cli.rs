use anyhow::{Context, Result};
use std::io::{self, Read};
use std::process::ExitCode;
use tracing::{error, info};

use crate::client::ChatClient;
use crate::model::GenerateOptions;

const EXIT_EMPTY_PROMPT: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptSource {
    Args,
    Stdin,
}

impl PromptSource {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Args => "args",
            Self::Stdin => "stdin",
        }
    }
}

/// Joins the arguments into a prompt, or reads all of `stdin` when there are none.
fn read_prompt(args: &[String], mut stdin: impl Read) -> Result<(String, PromptSource)> {
    if !args.is_empty() {
        return Ok((args.join(" ").trim().to_string(), PromptSource::Args));
    }

    eprintln!("Enter your request (end with Ctrl+D / Ctrl+Z):");
    let mut input = String::new();
    stdin
        .read_to_string(&mut input)
        .context("Failed to read prompt from stdin")?;
    Ok((input.trim().to_string(), PromptSource::Stdin))
}

async fn generate(prompt: &str) -> Result<String> {
    let client = ChatClient::from_env()?;
    let cfg = client.config();
    info!(
        provider = %cfg.provider,
        model = %cfg.model,
        endpoint = %cfg.endpoint,
        "resolved chat client configuration"
    );

    let code = client
        .generate_code(prompt, &GenerateOptions::default())
        .await?;
    Ok(code)
}

/// Runs the one-shot CLI: prompt in, generated code out.
pub async fn run(args: Vec<String>) -> ExitCode {
    let (prompt, source) = match read_prompt(&args, io::stdin().lock()) {
        Ok(read) => read,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    if prompt.is_empty() {
        eprintln!("No prompt provided.");
        return ExitCode::from(EXIT_EMPTY_PROMPT);
    }
    info!(
        source = source.as_str(),
        prompt_len = prompt.len(),
        "received prompt"
    );

    match generate(&prompt).await {
        Ok(code) => {
            println!("{code}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "code generation failed");
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
