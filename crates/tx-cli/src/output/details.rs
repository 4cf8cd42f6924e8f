use serde_json::Value;

pub(super) fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

pub(super) fn output_from_details<'a>(details: &'a Value, key: &str) -> Option<&'a str> {
    details
        .as_object()
        .and_then(|map| map.get(key))
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

/// Whether the failing command already wrote to the caller's terminal.
/// Replaying the capture on top of that would print everything twice.
pub(super) fn was_streamed(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("streamed"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Informational lines printed before the final status line: planned build
/// steps on a dry run, built artifacts, the `.gitignore` note from init.
pub(super) fn info_lines(details: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(planned) = details.get("planned").and_then(Value::as_array) {
        for step in planned.iter().filter_map(Value::as_str) {
            lines.push(format!("would run {step}"));
        }
    }
    if let Some(artifacts) = details.get("artifacts").and_then(Value::as_array) {
        for artifact in artifacts {
            if let Some(line) = artifact_line(artifact) {
                lines.push(line);
            }
        }
    }
    if let Some(note) = details.get("gitignore").and_then(Value::as_str) {
        lines.push(note.to_string());
    }
    lines
}

fn artifact_line(artifact: &Value) -> Option<String> {
    let path = artifact.get("path").and_then(Value::as_str)?;
    let bytes = artifact.get("bytes").and_then(Value::as_u64)?;
    let sha256 = artifact.get("sha256").and_then(Value::as_str)?;
    let digest = sha256.get(..12).unwrap_or(sha256);
    Some(format!("{path}  {}  sha256:{digest}", human_bytes(bytes)))
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
