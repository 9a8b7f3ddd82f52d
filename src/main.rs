use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Only ./.env; parent directories are not searched.
    dotenvy::from_path(".env").ok();
    codebot::logging::init();

    let args: Vec<String> = env::args().skip(1).collect();
    codebot::cli::run(args).await
}
