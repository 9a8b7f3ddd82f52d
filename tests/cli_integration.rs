use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY_VARS: [&str; 3] = ["GROK_API_KEY", "XAI_API_KEY", "GROQ_API_KEY"];
const CONFIG_VARS: [&str; 5] = [
    "GROK_PROVIDER",
    "GROK_ENDPOINT",
    "GROK_MODEL",
    "GROQ_MODEL",
    "GROK_TIMEOUT_SECS",
];

fn unique_temp_dir(suffix: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "codebot-cli-{suffix}-{stamp}-{}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("failed to create temp directory");
    dir
}

/// A `codebot` invocation isolated from the caller's keys and config. The binary
/// reads `.env` from `workdir` only, so a stray file higher up cannot leak in.
fn codebot(workdir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_codebot"));
    cmd.current_dir(workdir)
        .env("RUST_LOG", "codebot=info")
        .env_remove("LOG_OUTPUT")
        .env_remove("LOG_FORMAT")
        .env_remove("LOG_FILE_PATH")
        .stdin(Stdio::null());
    for var in KEY_VARS.iter().chain(CONFIG_VARS.iter()) {
        cmd.env_remove(var);
    }
    cmd
}

fn run(mut cmd: Command) -> Output {
    cmd.output().expect("failed to run codebot binary")
}

fn find_rotated_log_file(dir: &Path, base_file_name: &str) -> PathBuf {
    let expected_prefix = format!("{base_file_name}.");
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .expect("failed to read temp directory")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(&expected_prefix))
                .unwrap_or(false)
        })
        .collect();

    matches.sort();
    matches
        .pop()
        .expect("expected a rotated log file to be created")
}

#[test]
fn missing_api_key_exits_with_failure_code() {
    let dir = unique_temp_dir("nokey");
    let mut cmd = codebot(&dir);
    cmd.arg("write").arg("hello world");

    let output = run(cmd);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: No API key found"), "stderr:\n{stderr}");
    assert!(output.stdout.is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn dotenv_in_parent_directory_is_ignored() {
    let parent = unique_temp_dir("dotenv-parent");
    fs::write(parent.join(".env"), "XAI_API_KEY=xai-from-parent\n")
        .expect("failed to write parent .env");
    let child = parent.join("child");
    fs::create_dir_all(&child).expect("failed to create child directory");

    let mut cmd = codebot(&child);
    cmd.arg("hello");

    let output = run(cmd);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No API key found"), "stderr:\n{stderr}");

    let _ = fs::remove_dir_all(&parent);
}

#[tokio::test]
async fn dotenv_in_working_directory_is_loaded() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "ls -la"}}]
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let dir = unique_temp_dir("dotenv-local");
    fs::write(
        dir.join(".env"),
        format!(
            "XAI_API_KEY=xai-from-dotenv\nGROK_ENDPOINT={}/v1/chat/completions\n",
            provider.uri()
        ),
    )
    .expect("failed to write .env");

    let mut cmd = codebot(&dir);
    cmd.arg("list files");

    let output = tokio::task::spawn_blocking(move || run(cmd))
        .await
        .expect("command task should join");

    assert!(output.status.success(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ls -la");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn empty_stdin_prompt_exits_with_code_one() {
    let dir = unique_temp_dir("empty");
    let mut cmd = codebot(&dir);
    cmd.env("XAI_API_KEY", "xai-test-key")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().expect("failed to spawn codebot");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"   \n")
        .expect("failed to write stdin");
    let output = child.wait_with_output().expect("failed to wait for codebot");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Enter your request"), "stderr:\n{stderr}");
    assert!(stderr.contains("No prompt provided."), "stderr:\n{stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn prints_generated_code_on_success() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "print(42)"}}]
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let dir = unique_temp_dir("ok");
    let mut cmd = codebot(&dir);
    cmd.arg("print the answer")
        .env("XAI_API_KEY", "xai-test-key")
        .env("GROK_ENDPOINT", format!("{}/v1/chat/completions", provider.uri()));

    let output = tokio::task::spawn_blocking(move || run(cmd))
        .await
        .expect("command task should join");

    assert!(output.status.success(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "print(42)");

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn provider_rejection_exits_with_failure_code() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&provider)
        .await;

    let dir = unique_temp_dir("rejected");
    let mut cmd = codebot(&dir);
    cmd.arg("anything")
        .env("XAI_API_KEY", "xai-test-key")
        .env("GROK_ENDPOINT", format!("{}/v1/chat/completions", provider.uri()));

    let output = tokio::task::spawn_blocking(move || run(cmd))
        .await
        .expect("command task should join");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("403"), "stderr:\n{stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn json_format_emits_json_log_lines_on_stderr() {
    let dir = unique_temp_dir("json");
    let mut cmd = codebot(&dir);
    cmd.arg("hi").env("LOG_FORMAT", "json");

    let output = run(cmd);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let parsed: Vec<Value> = stderr
        .lines()
        .filter(|line| line.trim_start().starts_with('{'))
        .map(|line| serde_json::from_str::<Value>(line).expect("line should be valid JSON"))
        .collect();
    assert!(
        parsed.iter().any(|entry| {
            entry
                .get("fields")
                .and_then(|fields| fields.get("message"))
                .and_then(Value::as_str)
                == Some("received prompt")
        }),
        "expected prompt log message in JSON output, got stderr:\n{stderr}"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn file_output_writes_logs_to_rotated_file() {
    let dir = unique_temp_dir("file");
    let log_path = dir.join("codebot.log");
    let mut cmd = codebot(&dir);
    cmd.arg("hi")
        .env("LOG_OUTPUT", "file")
        .env("LOG_FILE_PATH", &log_path);

    let output = run(cmd);
    assert_eq!(output.status.code(), Some(2));

    let rotated = find_rotated_log_file(&dir, "codebot.log");
    let file_contents = fs::read_to_string(&rotated).expect("failed to read rotated log file");
    assert!(
        file_contents.contains("received prompt"),
        "expected prompt log message in file, got:\n{file_contents}"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        !stderr.contains("received prompt"),
        "did not expect logs on stderr for file-only mode:\n{stderr}"
    );
    assert!(
        stderr.contains("No API key found"),
        "expected command error output on stderr:\n{stderr}"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invalid_file_path_falls_back_to_stderr_logging() {
    let dir = unique_temp_dir("fallback");
    let blocking_file = dir.join("not-a-directory");
    fs::write(&blocking_file, "block").expect("failed to create blocking file");
    let mut cmd = codebot(&dir);
    cmd.arg("hi")
        .env("LOG_OUTPUT", "file")
        .env("LOG_FILE_PATH", blocking_file.join("codebot.log"));

    let output = run(cmd);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to initialize LOG_OUTPUT=file"),
        "expected fallback warning, got:\n{stderr}"
    );
    assert!(
        stderr.contains("using stderr instead"),
        "expected stderr fallback message, got:\n{stderr}"
    );
    assert!(
        stderr.contains("received prompt"),
        "expected logs to continue on stderr after fallback, got:\n{stderr}"
    );

    let _ = fs::remove_dir_all(&dir);
}
