pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use tokio::runtime::Runtime;
use vendorhub_core::config::{AppConfig, LoadOptions};
use vendorhub_db::{connect_with_settings, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// A classified command failure; `exit_code` is stable per `error_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl CommandFailure {
    pub fn new(error_class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class, message: message.into(), exit_code }
    }
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_outcome(command: &str, outcome: Result<String, CommandFailure>) -> Self {
        match outcome {
            Ok(message) => Self::success(command, message),
            Err(failure) => {
                Self::failure(command, failure.error_class, failure.message, failure.exit_code)
            }
        }
    }
}

/// Loads configuration and a current-thread runtime for a database command.
pub(crate) fn prepare() -> Result<(AppConfig, Runtime), CommandFailure> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandFailure::new("config_validation", format!("configuration issue: {error}"), 2)
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandFailure::new(
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    Ok((config, runtime))
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| CommandFailure::new("db_connectivity", error.to_string(), 4))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{CommandFailure, CommandResult};

    #[test]
    fn from_outcome_maps_failure_class_and_exit_code() {
        let result = CommandResult::from_outcome(
            "migrate",
            Err(CommandFailure::new("migration", "checksum mismatch", 5)),
        );

        assert_eq!(result.exit_code, 5);
        assert_eq!(
            result.output,
            r#"{"command":"migrate","status":"error","error_class":"migration","message":"checksum mismatch"}"#
        );
    }

    #[test]
    fn from_outcome_wraps_success_message() {
        let result = CommandResult::from_outcome("seed", Ok("done".to_string()));

        assert_eq!(result.exit_code, 0);
        assert_eq!(
            result.output,
            r#"{"command":"seed","status":"ok","error_class":null,"message":"done"}"#
        );
    }
}
