use anyhow::Result;
use serde_json::{json, Value};

use tx_domain::{CommandSpec, EnvConfig, ManifestError};

use crate::config::CommandContext;
use crate::core::envs::plan::plan_environment;
use crate::core::runtime::facade::{is_missing_manifest_error, missing_manifest_outcome};
use crate::outcome::ExecutionOutcome;

/// Names one environment to inspect.
#[derive(Debug, Clone)]
pub struct ShowRequest {
    pub env: String,
}

pub fn list_environments(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let manifest = match ctx.manifest() {
        Ok(manifest) => manifest,
        Err(err) if is_missing_manifest_error(&err) => return Ok(missing_manifest_outcome()),
        Err(err) => return Err(err),
    };
    let default_names: Vec<String> = if manifest.envlist.is_empty() {
        manifest.env_names()
    } else {
        manifest.envlist.clone()
    };
    let envs: Vec<Value> = manifest
        .envs
        .values()
        .map(|env| env_summary(env, default_names.contains(&env.name)))
        .collect();
    let count = envs.len();
    let noun = if count == 1 {
        "environment"
    } else {
        "environments"
    };
    Ok(ExecutionOutcome::success(
        format!("{count} {noun}"),
        json!({
            "manifest": manifest.manifest_path.display().to_string(),
            "default": default_names,
            "environments": envs,
        }),
    ))
}

pub fn show_environment(ctx: &CommandContext, request: &ShowRequest) -> Result<ExecutionOutcome> {
    let manifest = match ctx.manifest() {
        Ok(manifest) => manifest,
        Err(err) if is_missing_manifest_error(&err) => return Ok(missing_manifest_outcome()),
        Err(err) => return Err(err),
    };
    let Some(env) = manifest.env(&request.env) else {
        return Err(ManifestError::UnknownEnvironment {
            name: request.env.clone(),
            available: manifest.env_names(),
        }
        .into());
    };
    let plan = plan_environment(manifest.root.as_path(), ctx.config(), env);
    Ok(ExecutionOutcome::success(
        format!("environment `{}`", env.name),
        json!({
            "name": env.name,
            "description": env.description,
            "deps": env.deps,
            "commands": split_commands(env)?,
            "passenv": env.passenv,
            "setenv": env.setenv,
            "isolated": env.isolated,
            "python": env.python,
            "interpreter": plan.interpreter,
            "envdir": plan.envdir.display().to_string(),
        }),
    ))
}

fn env_summary(env: &EnvConfig, default: bool) -> Value {
    json!({
        "name": env.name,
        "description": env.description,
        "deps": env.deps,
        "commands": command_lines(env),
        "isolated": env.isolated,
        "default": default,
    })
}

fn command_lines(env: &EnvConfig) -> Vec<String> {
    env.commands.iter().map(CommandSpec::display_line).collect()
}

/// Commands as argv words, placeholders intact. Splitting was validated at
/// parse time, so this only fails on a manifest that never loaded.
fn split_commands(env: &EnvConfig) -> Result<Vec<Vec<String>>> {
    env.commands.iter().map(CommandSpec::words).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tx_domain::IndexMap;

    fn sample_env() -> EnvConfig {
        EnvConfig {
            name: "tests".to_string(),
            description: Some("unit tests".to_string()),
            deps: vec!["pytest>=8".to_string()],
            commands: vec![
                CommandSpec::Line("pytest {posargs} -k \"not slow\"".to_string()),
                CommandSpec::Argv(vec!["mypy".to_string(), "src".to_string()]),
            ],
            passenv: Vec::new(),
            setenv: IndexMap::new(),
            isolated: true,
            python: None,
        }
    }

    #[test]
    fn summaries_carry_display_lines_and_default_marker() {
        let summary = env_summary(&sample_env(), true);
        assert_eq!(summary["name"], "tests");
        assert_eq!(summary["default"], true);
        assert_eq!(summary["commands"][0], "pytest {posargs} -k \"not slow\"");
        assert_eq!(summary["commands"][1], "mypy src");
    }

    #[test]
    fn split_commands_keep_placeholders_and_quoting() {
        let split = split_commands(&sample_env()).unwrap();
        assert_eq!(split[0], vec!["pytest", "{posargs}", "-k", "not slow"]);
        assert_eq!(split[1], vec!["mypy", "src"]);
    }
}
