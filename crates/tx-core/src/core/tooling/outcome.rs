use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a command ended, independent of how the result gets rendered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

/// The single result type every operation returns.
///
/// `message` is a one-line human summary. `details` carries structured data
/// for `--json` output and for renderers that want more than the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CommandStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_serializes_kebab_case() {
        let value = serde_json::to_value(CommandStatus::UserError).unwrap();
        assert_eq!(value, json!("user-error"));
    }

    #[test]
    fn constructors_set_status() {
        assert!(ExecutionOutcome::success("done", json!({})).is_ok());
        assert_eq!(
            ExecutionOutcome::user_error("bad input", json!({})).status,
            CommandStatus::UserError
        );
        assert_eq!(
            ExecutionOutcome::failure("broke", json!({})).status,
            CommandStatus::Failure
        );
    }
}
