use serde_json::Value;

use super::details::hint_from_details;

pub(super) fn collect_why_bullets(details: &Value, fallback: &str) -> Vec<String> {
    let mut bullets = Vec::new();
    if let Some(reason) = details.get("reason").and_then(Value::as_str) {
        push_unique(
            &mut bullets,
            reason_display(reason).unwrap_or(reason).to_string(),
        );
    }
    if let Some(environment) = details.get("environment").and_then(Value::as_str) {
        push_unique(&mut bullets, format!("Environment: {environment}"));
    }
    if let Some(step) = details.get("step").and_then(Value::as_str) {
        push_unique(&mut bullets, format!("Build step: {step}"));
    }
    if let Some(issues) = details.get("issues").and_then(Value::as_array) {
        for issue in issues.iter().filter_map(Value::as_str) {
            push_unique(&mut bullets, issue.to_string());
        }
    }
    if bullets.is_empty() {
        bullets.push(fallback.to_string());
    }
    bullets
}

pub(super) fn collect_fix_bullets(details: &Value) -> Vec<String> {
    let mut fixes = Vec::new();
    if let Some(hint) = hint_from_details(details) {
        push_unique(&mut fixes, hint.to_string());
    }
    if fixes.is_empty() {
        fixes.push("Re-run with --help for usage or inspect the output above.".to_string());
    }
    fixes
}

fn push_unique(vec: &mut Vec<String>, text: impl Into<String>) {
    let entry = text.into();
    if entry.trim().is_empty() {
        return;
    }
    if !vec.iter().any(|existing| existing == &entry) {
        vec.push(entry);
    }
}

fn reason_display(code: &str) -> Option<&'static str> {
    match code {
        "missing_interpreter" => Some("The configured Python interpreter was not found on PATH."),
        "invalid_manifest" => Some("The environment manifest did not parse or validate."),
        "unknown_environment" => Some("No environment with that name is declared."),
        "missing_setup_py" => Some("The project has no setup.py to drive the build."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn why_bullets_map_reasons_and_dedupe_issues() {
        let details = json!({
            "reason": "unknown_environment",
            "environment": "docs",
            "issues": ["lookup failed", "lookup failed"]
        });
        let bullets = collect_why_bullets(&details, "fallback");
        assert_eq!(bullets[0], "No environment with that name is declared.");
        assert!(bullets.iter().any(|b| b == "Environment: docs"));
        assert_eq!(
            bullets.iter().filter(|b| b.contains("lookup failed")).count(),
            1
        );
    }

    #[test]
    fn unmapped_reasons_appear_verbatim() {
        let bullets = collect_why_bullets(&json!({ "reason": "step_failed" }), "fallback");
        assert_eq!(bullets, vec!["step_failed"]);
    }

    #[test]
    fn empty_details_fall_back_to_the_message() {
        let bullets = collect_why_bullets(&json!({}), "everything broke");
        assert_eq!(bullets, vec!["everything broke"]);
    }

    #[test]
    fn fix_bullets_prefer_the_hint() {
        let fixes = collect_fix_bullets(&json!({ "hint": "Run `tx init` first." }));
        assert_eq!(fixes, vec!["Run `tx init` first."]);
        let fallback = collect_fix_bullets(&json!({}));
        assert_eq!(fallback.len(), 1);
        assert!(fallback[0].contains("--help"));
    }
}
