use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::Duration;

fn error_chain_has_kind(
    err: &(dyn StdError + 'static),
    kind: ErrorKind,
    needle: &str,
) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_has_kind(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_has_kind(err, ErrorKind::TimedOut, "timed out")
}

/// Turns a transport-level reqwest failure into a message that points at the
/// setting most likely to fix it.
pub(crate) fn describe_request_error(
    err: &reqwest::Error,
    endpoint: &str,
    timeout: Duration,
) -> String {
    if err.is_timeout() || error_chain_has_timeout(err) {
        return format!(
            "Chat API request timed out after {}s while calling '{}'. \
             Increase GROK_TIMEOUT_SECS or check provider responsiveness.",
            timeout.as_secs_f64(),
            endpoint
        );
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(err) {
            return format!(
                "Connection refused by chat API at '{}'. Check GROK_ENDPOINT.",
                endpoint
            );
        }

        return format!(
            "Failed to connect to chat API at '{}'. \
             Check GROK_ENDPOINT and network connectivity.",
            endpoint
        );
    }

    format!("Failed to call chat API at '{}': {}", endpoint, err)
}
