use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

use crate::core::envs::plan::EnvRunPlan;
use crate::outcome::ExecutionOutcome;
use crate::process::{run_command, ChildEnv, RunOutput};
use crate::progress::ProgressReporter;

/// Sentinel recording which requirements an envdir was last synced to.
const DEP_STAMP_FILE: &str = "tx-deps.txt";

pub(crate) enum PrepareResult {
    Ready(PreparedEnv),
    Failed(ExecutionOutcome),
}

pub(crate) struct PreparedEnv {
    pub bin_dir: PathBuf,
    pub created: bool,
    pub installed: usize,
}

/// Brings an isolated environment up to date: create the venv if missing,
/// then sync requirements when they differ from the recorded stamp.
pub(crate) fn prepare_environment(root: &Path, plan: &EnvRunPlan<'_>) -> Result<PrepareResult> {
    let name = &plan.env.name;
    let env_python = plan.env_python();
    let mut created = false;

    if !env_python.exists() {
        if which::which(&plan.interpreter).is_err() {
            return Ok(PrepareResult::Failed(ExecutionOutcome::user_error(
                format!("interpreter `{}` not found", plan.interpreter),
                json!({
                    "reason": "missing_interpreter",
                    "environment": name,
                    "interpreter": plan.interpreter,
                    "hint": "Install it or point PYTHON at an existing interpreter.",
                }),
            )));
        }
        let _spin = ProgressReporter::spinner(format!("creating environment `{name}`"));
        debug!(environment = %name, interpreter = %plan.interpreter, "creating virtual environment");
        let args = vec![
            "-m".to_string(),
            "venv".to_string(),
            plan.envdir.display().to_string(),
        ];
        let output = run_command(&plan.interpreter, &args, ChildEnv::Inherit(&[]), Some(root))?;
        if output.code != 0 {
            return Ok(PrepareResult::Failed(venv_failure(
                name,
                &plan.interpreter,
                &output,
            )));
        }
        created = true;
    }

    let stamp_path = plan.envdir.join(DEP_STAMP_FILE);
    let desired = render_dep_stamp(&plan.env.deps);
    let recorded = fs::read_to_string(&stamp_path).ok();
    let mut installed = 0;

    if recorded.as_deref() != Some(desired.as_str()) {
        if !plan.env.deps.is_empty() {
            let _spin = ProgressReporter::spinner(format!(
                "installing {} requirement(s) into `{name}`",
                plan.env.deps.len()
            ));
            debug!(environment = %name, count = plan.env.deps.len(), "installing requirements");
            let mut args = vec!["-m".to_string(), "pip".to_string(), "install".to_string()];
            args.extend(plan.env.deps.iter().cloned());
            let pip_env = [("PIP_DISABLE_PIP_VERSION_CHECK".to_string(), "1".to_string())];
            let python = env_python.display().to_string();
            let output = run_command(&python, &args, ChildEnv::Inherit(&pip_env), Some(root))?;
            if output.code != 0 {
                return Ok(PrepareResult::Failed(install_failure(name, &output)));
            }
            installed = plan.env.deps.len();
        }
        write_dep_stamp(&stamp_path, &plan.envdir, &desired)?;
    }

    Ok(PrepareResult::Ready(PreparedEnv {
        bin_dir: plan.bin_dir(),
        created,
        installed,
    }))
}

pub(crate) fn render_dep_stamp(deps: &[String]) -> String {
    let mut text = String::new();
    for dep in deps {
        text.push_str(dep);
        text.push('\n');
    }
    text
}

// Stamp lands via rename so an interrupted sync retries instead of lying.
fn write_dep_stamp(path: &Path, envdir: &Path, contents: &str) -> Result<()> {
    let mut temp = tempfile::NamedTempFile::new_in(envdir)
        .with_context(|| format!("staging {}", path.display()))?;
    temp.write_all(contents.as_bytes())
        .with_context(|| format!("staging {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn venv_failure(name: &str, interpreter: &str, output: &RunOutput) -> ExecutionOutcome {
    ExecutionOutcome::failure(
        format!(
            "failed to create environment `{name}` (exit code {})",
            output.code
        ),
        json!({
            "reason": "venv_failed",
            "environment": name,
            "interpreter": interpreter,
            "code": output.code,
            "stdout": output.stdout,
            "stderr": output.stderr,
        }),
    )
}

fn install_failure(name: &str, output: &RunOutput) -> ExecutionOutcome {
    ExecutionOutcome::failure(
        format!(
            "failed to install requirements for `{name}` (exit code {})",
            output.code
        ),
        json!({
            "reason": "install_failed",
            "environment": name,
            "code": output.code,
            "stdout": output.stdout,
            "stderr": output.stderr,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_renders_one_requirement_per_line() {
        assert_eq!(render_dep_stamp(&[]), "");
        assert_eq!(
            render_dep_stamp(&["pytest>=8".to_string(), "ruff".to_string()]),
            "pytest>=8\nruff\n"
        );
    }

    #[test]
    fn stamp_write_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = dir.path().join(DEP_STAMP_FILE);
        let desired = render_dep_stamp(&["pytest".to_string()]);
        write_dep_stamp(&stamp, dir.path(), &desired).unwrap();
        assert_eq!(fs::read_to_string(&stamp).unwrap(), desired);
    }

    #[test]
    fn changed_requirements_invalidate_the_stamp() {
        let recorded = render_dep_stamp(&["pytest==8.0".to_string()]);
        let desired = render_dep_stamp(&["pytest==8.1".to_string()]);
        assert_ne!(recorded, desired);
        assert_eq!(recorded, render_dep_stamp(&["pytest==8.0".to_string()]));
    }
}
