use anyhow::Error;
use serde_json::{json, Value};
use tx_domain::ManifestError;

use crate::config::CommandInfo;
use crate::outcome::{CommandStatus, ExecutionOutcome};

pub const MISSING_MANIFEST_MESSAGE: &str = "No tx manifest found.";
pub const MISSING_MANIFEST_HINT: &str = "Run `tx init` in your project directory first.";

pub fn missing_manifest_outcome() -> ExecutionOutcome {
    ExecutionOutcome::user_error(
        MISSING_MANIFEST_MESSAGE,
        json!({
            "reason": "missing_manifest",
            "hint": MISSING_MANIFEST_HINT,
        }),
    )
}

/// Whether `err` is manifest discovery coming up empty, at any chain depth.
pub fn is_missing_manifest_error(err: &Error) -> bool {
    err.chain()
        .any(|cause| cause.to_string().contains("No tx manifest found"))
}

/// Maps manifest problems to user errors instead of generic failures.
///
/// Returns `None` when the error is not manifest-shaped and should keep its
/// failure status.
pub fn manifest_error_outcome(err: &Error) -> Option<ExecutionOutcome> {
    if let Some(manifest_err) = err.downcast_ref::<ManifestError>() {
        let outcome = match manifest_err {
            ManifestError::UnknownEnvironment { name, available } => {
                let hint = if available.is_empty() {
                    "The manifest declares no environments.".to_string()
                } else {
                    format!("Declared environments: {}.", available.join(", "))
                };
                ExecutionOutcome::user_error(
                    format!("unknown environment `{name}`"),
                    json!({
                        "reason": "unknown_environment",
                        "environment": name,
                        "available": available,
                        "hint": hint,
                    }),
                )
            }
            other => ExecutionOutcome::user_error(
                other.to_string(),
                json!({
                    "reason": "invalid_manifest",
                    "hint": "Fix the environment manifest and rerun the command.",
                }),
            ),
        };
        return Some(outcome);
    }

    if err.downcast_ref::<toml_edit::TomlError>().is_some() {
        let target = err
            .chain()
            .find_map(|cause| {
                let text = cause.to_string();
                if text.contains("pyproject.toml") {
                    Some("pyproject.toml")
                } else if text.contains("tx.toml") {
                    Some("tx.toml")
                } else {
                    None
                }
            })
            .unwrap_or("tx.toml");
        return Some(ExecutionOutcome::user_error(
            format!("{target} is not valid TOML"),
            json!({
                "reason": "invalid_manifest",
                "target": target,
                "error": format!("{err:#}"),
                "hint": format!("Fix {target} syntax and rerun the command."),
            }),
        ));
    }

    None
}

/// Envelope for `--json` output. Failures surface as `"error"` here; the
/// enum's own serialization stays `"failure"` for internal use.
pub fn to_json_response(info: &CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    json!({
        "status": status,
        "message": format_status_message(info, &outcome.message),
        "details": outcome.details,
    })
}

/// Prefixes a summary with the command it came from.
///
/// `tx run tests: ...` for named invocations, collapsing to `tx list: ...`
/// when the name repeats the group. Messages that already carry the prefix
/// pass through untouched.
pub fn format_status_message(info: &CommandInfo, message: &str) -> String {
    let group = info.group.to_string();
    let prefix = if group == info.name {
        format!("tx {group}")
    } else {
        format!("tx {group} {}", info.name)
    };
    if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}
