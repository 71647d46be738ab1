use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use shiftbot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let lines = vec![
        "effective config (source precedence: overrides > env > file > default):".to_string(),
        render_line(
            "database.url",
            &config.database.url,
            source("database.url", "SHIFTBOT_DATABASE_URL"),
        ),
        render_line(
            "database.max_connections",
            &config.database.max_connections.to_string(),
            source("database.max_connections", "SHIFTBOT_DATABASE_MAX_CONNECTIONS"),
        ),
        render_line(
            "database.timeout_secs",
            &config.database.timeout_secs.to_string(),
            source("database.timeout_secs", "SHIFTBOT_DATABASE_TIMEOUT_SECS"),
        ),
        render_line(
            "server.bind_address",
            &config.server.bind_address,
            source("server.bind_address", "SHIFTBOT_SERVER_BIND_ADDRESS"),
        ),
        render_line(
            "server.health_check_port",
            &config.server.health_check_port.to_string(),
            source("server.health_check_port", "SHIFTBOT_SERVER_HEALTH_CHECK_PORT"),
        ),
        render_line(
            "server.graceful_shutdown_secs",
            &config.server.graceful_shutdown_secs.to_string(),
            source("server.graceful_shutdown_secs", "SHIFTBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"),
        ),
        render_line(
            "admission.max_transient_retries",
            &config.admission.max_transient_retries.to_string(),
            source("admission.max_transient_retries", "SHIFTBOT_ADMISSION_MAX_TRANSIENT_RETRIES"),
        ),
        render_line(
            "admission.retry_backoff_ms",
            &config.admission.retry_backoff_ms.to_string(),
            source("admission.retry_backoff_ms", "SHIFTBOT_ADMISSION_RETRY_BACKOFF_MS"),
        ),
        render_line(
            "admission.context_ttl_minutes",
            &config.admission.context_ttl_minutes.to_string(),
            source("admission.context_ttl_minutes", "SHIFTBOT_ADMISSION_CONTEXT_TTL_MINUTES"),
        ),
        render_line(
            "admission.page_size",
            &config.admission.page_size.to_string(),
            source("admission.page_size", "SHIFTBOT_ADMISSION_PAGE_SIZE"),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", "SHIFTBOT_LOGGING_LEVEL"),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            source("logging.format", "SHIFTBOT_LOGGING_FORMAT"),
        ),
    ];

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("shiftbot.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/shiftbot.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
