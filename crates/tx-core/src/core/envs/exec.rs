use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use tx_domain::{select_environments, EnvConfig, EnvManifest};

use crate::config::CommandContext;
use crate::core::envs::plan::{plan_environment, EnvRunPlan};
use crate::core::envs::prepare::{prepare_environment, PrepareResult, PreparedEnv};
use crate::core::runtime::facade::{is_missing_manifest_error, missing_manifest_outcome};
use crate::outcome::ExecutionOutcome;
use crate::process::{run_command, run_command_streaming, ChildEnv, RunOutput};

/// Environment selection plus arguments spliced into `{posargs}`.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub envs: Vec<String>,
    pub posargs: Vec<String>,
}

/// Variables every isolated environment keeps from the caller. `LC_*` passes
/// as a family, handled separately.
const DEFAULT_PASSENV: [&str; 12] = [
    "PATH", "HOME", "LANG", "LANGUAGE", "TMPDIR", "TEMP", "TMP", "TERM", "USER", "LOGNAME",
    "SHELL", "CI",
];

enum EnvRun {
    Completed,
    Stopped(ExecutionOutcome),
}

/// Runs the selected environments in order, stopping at the first command
/// that exits non-zero.
pub fn run_environments(ctx: &CommandContext, request: &RunRequest) -> Result<ExecutionOutcome> {
    let manifest = match ctx.manifest() {
        Ok(manifest) => manifest,
        Err(err) if is_missing_manifest_error(&err) => return Ok(missing_manifest_outcome()),
        Err(err) => return Err(err),
    };
    let selected = select_environments(&manifest, &request.envs)?;
    if selected.is_empty() {
        return Ok(ExecutionOutcome::user_error(
            "no environments to run",
            json!({
                "reason": "no_environments",
                "hint": "Declare [env.NAME] tables in the manifest.",
            }),
        ));
    }

    let mut records: Vec<Value> = Vec::new();
    let mut ran: Vec<String> = Vec::new();
    for env in selected {
        match run_one_environment(ctx, &manifest, env, &request.posargs, &mut records)? {
            EnvRun::Completed => ran.push(env.name.clone()),
            EnvRun::Stopped(outcome) => return Ok(attach_records(outcome, records)),
        }
    }

    let noun = if ran.len() == 1 {
        "environment"
    } else {
        "environments"
    };
    Ok(ExecutionOutcome::success(
        format!("{} {noun} ok ({})", ran.len(), ran.join(", ")),
        json!({
            "environments": ran,
            "posargs": request.posargs,
            "records": records,
        }),
    ))
}

fn run_one_environment(
    ctx: &CommandContext,
    manifest: &EnvManifest,
    env: &EnvConfig,
    posargs: &[String],
    records: &mut Vec<Value>,
) -> Result<EnvRun> {
    let root = manifest.root.as_path();
    let plan = plan_environment(root, ctx.config(), env);
    let commands = plan.resolved_commands(root, posargs)?;

    let prepared = if env.isolated {
        match prepare_environment(root, &plan)? {
            PrepareResult::Ready(prepared) => Some(prepared),
            PrepareResult::Failed(outcome) => return Ok(EnvRun::Stopped(outcome)),
        }
    } else {
        None
    };
    if let Some(prepared) = prepared.as_ref() {
        if prepared.created || prepared.installed > 0 {
            records.push(json!({
                "environment": env.name,
                "prepared": {
                    "created": prepared.created,
                    "installed": prepared.installed,
                },
            }));
        }
    }

    let pairs = assemble_child_env(env, &plan, prepared.as_ref());

    for argv in &commands {
        let Some((program, args)) = argv.split_first() else {
            return Ok(EnvRun::Stopped(ExecutionOutcome::user_error(
                format!(
                    "environment `{}` has a command that expanded to nothing",
                    env.name
                ),
                json!({ "reason": "empty_command", "environment": env.name }),
            )));
        };
        debug!(environment = %env.name, command = %argv.join(" "), "running command");
        let started = Instant::now();
        let streamed = !ctx.global.json;
        let child_env = if env.isolated {
            ChildEnv::Exact(&pairs)
        } else {
            ChildEnv::Inherit(&pairs)
        };
        let output = if streamed {
            run_command_streaming(program, args, child_env, Some(root))?
        } else {
            run_command(program, args, child_env, Some(root))?
        };
        records.push(json!({
            "environment": env.name,
            "command": argv,
            "code": output.code,
            "duration_ms": started.elapsed().as_millis() as u64,
        }));
        if output.code != 0 {
            return Ok(EnvRun::Stopped(command_failure(
                &env.name, argv, &output, streamed,
            )));
        }
    }
    Ok(EnvRun::Completed)
}

/// Builds the variable pairs for an environment's commands. Later pairs win
/// when keys repeat, so `setenv` comes last.
fn assemble_child_env(
    env: &EnvConfig,
    plan: &EnvRunPlan<'_>,
    prepared: Option<&PreparedEnv>,
) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    if let Some(prepared) = prepared {
        for (key, value) in std::env::vars() {
            if passes_through(env, &key) {
                pairs.push((key, value));
            }
        }
        pairs.push((
            "VIRTUAL_ENV".to_string(),
            plan.envdir.display().to_string(),
        ));
        pairs.push(("PATH".to_string(), prepended_path(&prepared.bin_dir)));
    }
    for (key, value) in &env.setenv {
        pairs.push((key.clone(), value.clone()));
    }
    pairs
}

fn passes_through(env: &EnvConfig, key: &str) -> bool {
    if DEFAULT_PASSENV.contains(&key) || key.starts_with("LC_") {
        return true;
    }
    env.passenv
        .iter()
        .any(|pattern| passenv_matches(pattern, key))
}

/// `passenv` patterns are exact names or a trailing-`*` prefix glob.
fn passenv_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}

fn prepended_path(bin_dir: &Path) -> String {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let mut parts = vec![bin_dir.to_path_buf()];
    parts.extend(std::env::split_paths(&inherited));
    match std::env::join_paths(parts) {
        Ok(joined) => joined.to_string_lossy().into_owned(),
        Err(_) => bin_dir.display().to_string(),
    }
}

fn attach_records(mut outcome: ExecutionOutcome, records: Vec<Value>) -> ExecutionOutcome {
    if let Value::Object(details) = &mut outcome.details {
        details.insert("records".to_string(), Value::Array(records));
    }
    outcome
}

fn command_failure(
    name: &str,
    argv: &[String],
    output: &RunOutput,
    streamed: bool,
) -> ExecutionOutcome {
    ExecutionOutcome::failure(
        format!("environment `{name}` failed (exit code {})", output.code),
        json!({
            "reason": "command_failed",
            "environment": name,
            "command": argv,
            "code": output.code,
            "stdout": output.stdout,
            "stderr": output.stderr,
            "streamed": streamed,
        }),
    )
}
