pub mod config;
pub mod doctor;
pub mod order;
pub mod price;

use serde::Serialize;
use serde_json::json;

/// Failure classification for the JSON payload. The class also fixes the
/// process exit code, so scripts can branch on either without parsing text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    CartFile,
    PromotionFile,
    PromotionWindow,
    RecordFile,
    Serialization,
}

impl ErrorClass {
    fn exit_code(self) -> u8 {
        match self {
            ErrorClass::CartFile | ErrorClass::PromotionFile | ErrorClass::RecordFile => 2,
            ErrorClass::PromotionWindow => 3,
            ErrorClass::Serialization => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    error_class: Option<ErrorClass>,
    message: String,
}

impl CommandResult {
    pub fn failure(command: &str, class: ErrorClass, message: impl Into<String>) -> Self {
        let outcome = CommandOutcome {
            command,
            status: "error",
            error_class: Some(class),
            message: message.into(),
        };
        Self { exit_code: class.exit_code(), output: serialize(&outcome) }
    }

    /// Pre-rendered successful output, either pretty JSON or the human view.
    pub fn raw(output: String) -> Self {
        Self { exit_code: 0, output }
    }
}

fn serialize(outcome: &CommandOutcome<'_>) -> String {
    serde_json::to_string(outcome).unwrap_or_else(|error| {
        json!({
            "command": outcome.command,
            "status": "error",
            "error_class": "serialization",
            "message": error.to_string(),
        })
        .to_string()
    })
}
