pub mod config;
pub mod doctor;
pub mod migrate;
pub mod status;

use std::future::Future;

use serde::Serialize;

/// Exit codes shared by the database-touching subcommands.
pub mod exit_codes {
    pub const CONFIG: u8 = 2;
    pub const RUNTIME: u8 = 3;
    pub const DB_CONNECTIVITY: u8 = 4;
    pub const STORE: u8 = 5;
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandReport<'a> {
    command: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'a str>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: serialize_report(CommandReport {
                command,
                status: "ok",
                error_class: None,
                message: message.into(),
            }),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self {
            exit_code,
            output: serialize_report(CommandReport {
                command,
                status: "error",
                error_class: Some(error_class),
                message: message.into(),
            }),
        }
    }
}

fn serialize_report(report: CommandReport<'_>) -> String {
    serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// One-shot current-thread runtime for subcommands that query the store.
pub(crate) fn run_blocking<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))?;
    Ok(runtime.block_on(future))
}
