use std::collections::BTreeMap;

use serde::Deserialize;
use tx_core::api::{format_status_message, CommandGroup, CommandInfo, ExecutionOutcome};

use crate::style::Style;

/// Environment summary as `tx list` reports it in the details.
#[derive(Debug, Deserialize)]
struct EnvSummary {
    name: String,
    description: Option<String>,
    commands: Vec<String>,
    default: bool,
}

#[derive(Debug, Deserialize)]
struct ListPayload {
    environments: Vec<EnvSummary>,
}

/// Resolved environment as `tx show` reports it in the details.
#[derive(Debug, Deserialize)]
struct ShowPayload {
    name: String,
    description: Option<String>,
    deps: Vec<String>,
    commands: Vec<Vec<String>>,
    passenv: Vec<String>,
    setenv: BTreeMap<String, String>,
    isolated: bool,
    interpreter: String,
    envdir: String,
}

/// Renders list/show payloads. Falls through to the generic status line when
/// the details do not carry the expected shape.
pub(super) fn render_listing(
    style: &Style,
    info: &CommandInfo,
    outcome: &ExecutionOutcome,
) -> bool {
    match info.group {
        CommandGroup::List => {
            let Ok(payload) = serde_json::from_value::<ListPayload>(outcome.details.clone())
            else {
                return false;
            };
            for line in list_lines(&payload) {
                println!("{line}");
            }
            let message = format_status_message(info, &outcome.message);
            println!("{}", style.status(&outcome.status, &message));
            true
        }
        CommandGroup::Show => {
            let Ok(payload) = serde_json::from_value::<ShowPayload>(outcome.details.clone())
            else {
                return false;
            };
            for line in show_lines(&payload) {
                println!("{line}");
            }
            true
        }
        _ => false,
    }
}

/// One line per environment: a `*` marks envlist members, then the name and
/// the description (or the commands when there is none).
fn list_lines(payload: &ListPayload) -> Vec<String> {
    let pad = payload
        .environments
        .iter()
        .map(|env| env.name.len())
        .max()
        .unwrap_or(0);
    payload
        .environments
        .iter()
        .map(|env| {
            let marker = if env.default { "*" } else { " " };
            let summary = env
                .description
                .clone()
                .unwrap_or_else(|| env.commands.join("; "));
            format!("{marker} {:<pad$}  {summary}", env.name)
        })
        .collect()
}

fn show_lines(payload: &ShowPayload) -> Vec<String> {
    let pad = "description:".len();
    let mut lines = vec![kv("name:", &payload.name, pad)];
    if let Some(description) = &payload.description {
        lines.push(kv("description:", description, pad));
    }
    lines.push(kv("interpreter:", &payload.interpreter, pad));
    lines.push(kv("envdir:", &payload.envdir, pad));
    lines.push(kv(
        "isolated:",
        if payload.isolated { "yes" } else { "no" },
        pad,
    ));
    let deps = if payload.deps.is_empty() {
        "(none)".to_string()
    } else {
        payload.deps.join(", ")
    };
    lines.push(kv("deps:", &deps, pad));
    for (index, words) in payload.commands.iter().enumerate() {
        let rendered = words.join(" ");
        if index == 0 {
            lines.push(kv("commands:", &rendered, pad));
        } else {
            lines.push(format!("{:pad$}  {rendered}", ""));
        }
    }
    if !payload.passenv.is_empty() {
        lines.push(kv("passenv:", &payload.passenv.join(", "), pad));
    }
    for (index, (key, value)) in payload.setenv.iter().enumerate() {
        let rendered = format!("{key}={value}");
        if index == 0 {
            lines.push(kv("setenv:", &rendered, pad));
        } else {
            lines.push(format!("{:pad$}  {rendered}", ""));
        }
    }
    lines
}

fn kv(label: &str, value: &str, pad: usize) -> String {
    format!("{label:<pad$}  {value}")
}
