use serde_json::Value;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_PATH: &str = "/tmp/logchat-debug.log";
const DEBUG_PAYLOAD_ENV: &str = "LOGCHAT_DEBUG_PAYLOAD";
const LOG_PATH_ENV: &str = "LOGCHAT_LOG_PATH";
const LOG_FILTER_ENV: &str = "LOGCHAT_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false)
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::debug!(
        url = request_url,
        payload = %formatted_payload,
        "completion request payload"
    );
}

pub fn emit_frame_parse_error(payload: &str, parse_error: &serde_json::Error) {
    tracing::warn!(
        error = %parse_error,
        data = payload,
        "skipping malformed event-stream frame"
    );
}

/// Install the global `tracing` subscriber.
///
/// Interactive sessions log to a file so that diagnostics never interleave
/// with streamed answers on the terminal.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let log_file = resolve_log_path()
        .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());
    let installed = match log_file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if let Err(error) = installed {
        eprintln!("logchat: tracing already initialised: {error}");
    }
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}
