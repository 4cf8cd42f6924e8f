use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

use tx_domain::{locate_manifest_in, TX_TOML};

use crate::config::CommandContext;
use crate::outcome::ExecutionOutcome;

const STARTER_MANIFEST: &str = r#"# Environments for this project. Run them with `tx run`.

[tx]
envlist = ["tests"]

[env.tests]
deps = ["pytest"]
commands = ["pytest {posargs}"]
"#;

/// Writes a starter `tx.toml` into the working directory and keeps the work
/// directory out of version control when a `.gitignore` is present.
pub fn init_manifest(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let dir = std::env::current_dir().context("resolving the working directory")?;
    if let Some(existing) = locate_manifest_in(&dir)? {
        let file = existing.source.file_name();
        return Ok(ExecutionOutcome::user_error(
            format!("{file} already configures environments"),
            json!({
                "reason": "manifest_exists",
                "manifest": existing.path.display().to_string(),
                "hint": format!("Edit {file} to change environments."),
            }),
        ));
    }

    let manifest_path = dir.join(TX_TOML);
    fs::write(&manifest_path, STARTER_MANIFEST)
        .with_context(|| format!("writing {}", manifest_path.display()))?;
    debug!(manifest = %manifest_path.display(), "wrote starter manifest");

    let ignored = ensure_gitignore(&dir, &ctx.config().work.env_root)?;
    let mut details = json!({
        "manifest": manifest_path.display().to_string(),
        "environments": ["tests"],
    });
    if let Some(line) = ignored {
        details["gitignore"] = json!(format!("added `{line}` to .gitignore"));
    }
    Ok(ExecutionOutcome::success("created tx.toml", details))
}

/// Appends the work directory to `.gitignore` when the file exists and does
/// not cover it yet. Returns the appended line.
fn ensure_gitignore(dir: &Path, env_root: &str) -> Result<Option<String>> {
    let path = dir.join(".gitignore");
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let line = format!("{}/", env_root.trim_end_matches('/'));
    let covered = contents.lines().any(|existing| {
        let trimmed = existing.trim();
        trimmed == line || trimmed == env_root
    });
    if covered {
        return Ok(None);
    }
    let mut updated = contents;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&line);
    updated.push('\n');
    fs::write(&path, updated).with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(line))
}
