use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::CommandContext;
use crate::core::dist::plan::{plan_distribution, DistRequest};
use crate::core::runtime::facade::{is_missing_manifest_error, missing_manifest_outcome};
use crate::outcome::ExecutionOutcome;
use crate::process::{run_command, ChildEnv, RunOutput};
use crate::progress::ProgressReporter;

/// Builds an sdist and then a wheel from it, strictly in that order.
///
/// The wheel comes from the freshly built sdist rather than the source tree,
/// so what ships is what the sdist contains.
pub fn build_distributions(ctx: &CommandContext, request: &DistRequest) -> Result<ExecutionOutcome> {
    let root = match ctx.project_root() {
        Ok(root) => root.to_path_buf(),
        Err(err) if is_missing_manifest_error(&err) => return Ok(missing_manifest_outcome()),
        Err(err) => return Err(err),
    };
    let plan = plan_distribution(&root, ctx.config(), request);

    let setup_py = root.join("setup.py");
    if !setup_py.exists() {
        return Ok(ExecutionOutcome::user_error(
            "setup.py not found",
            json!({
                "reason": "missing_setup_py",
                "root": root.display().to_string(),
                "hint": "tx dist drives a setup.py build. Add one or build with your packaging tool directly.",
            }),
        ));
    }

    let out_rel = relative_path_str(&plan.out_dir, &root);
    if request.dry_run {
        let planned = vec![
            render_argv(&plan.python, &plan.sdist_argv()),
            render_argv(&plan.python, &plan.wheel_argv(Path::new("<sdist>"))),
        ];
        return Ok(ExecutionOutcome::success(
            format!("dry-run: would build sdist and wheel into {out_rel}"),
            json!({
                "dry_run": true,
                "out_dir": out_rel,
                "planned": planned,
            }),
        ));
    }

    if which::which(&plan.python).is_err() {
        return Ok(ExecutionOutcome::user_error(
            format!("interpreter `{}` not found", plan.python),
            json!({
                "reason": "missing_interpreter",
                "interpreter": plan.python,
                "hint": "Install it or point PYTHON at an existing interpreter.",
            }),
        ));
    }

    fs::create_dir_all(&plan.out_dir)
        .with_context(|| format!("creating {}", plan.out_dir.display()))?;

    let mut steps: Vec<Value> = Vec::new();

    let sdist_out = {
        let _spin = ProgressReporter::spinner("building sdist");
        debug!(python = %plan.python, out_dir = %plan.out_dir.display(), "building sdist");
        run_command(
            &plan.python,
            &plan.sdist_argv(),
            ChildEnv::Inherit(&[]),
            Some(&root),
        )?
    };
    steps.push(step_record("sdist", &sdist_out));
    if sdist_out.code != 0 {
        return Ok(step_failure("sdist", &sdist_out, steps));
    }
    let Some(sdist) = newest_artifact(&plan.out_dir, ".tar.gz")? else {
        return Ok(ExecutionOutcome::failure(
            "sdist build produced no archive",
            json!({ "reason": "no_sdist", "out_dir": out_rel, "steps": steps }),
        ));
    };

    let wheel_out = {
        let _spin = ProgressReporter::spinner("building wheel");
        debug!(sdist = %sdist.display(), "building wheel from sdist");
        let pip_env = [("PIP_DISABLE_PIP_VERSION_CHECK".to_string(), "1".to_string())];
        run_command(
            &plan.python,
            &plan.wheel_argv(&sdist),
            ChildEnv::Inherit(&pip_env),
            Some(&root),
        )?
    };
    steps.push(step_record("wheel", &wheel_out));
    if wheel_out.code != 0 {
        return Ok(step_failure("wheel", &wheel_out, steps));
    }
    let Some(wheel) = newest_artifact(&plan.out_dir, ".whl")? else {
        return Ok(ExecutionOutcome::failure(
            "wheel build produced no wheel",
            json!({ "reason": "no_wheel", "out_dir": out_rel, "steps": steps }),
        ));
    };

    let artifacts = vec![
        artifact_summary(&sdist, &root)?,
        artifact_summary(&wheel, &root)?,
    ];
    Ok(ExecutionOutcome::success(
        format!(
            "wrote {} and {} to {out_rel}",
            file_name(&sdist),
            file_name(&wheel)
        ),
        json!({
            "dry_run": false,
            "out_dir": out_rel,
            "artifacts": artifacts,
            "steps": steps,
        }),
    ))
}

fn step_record(step: &str, output: &RunOutput) -> Value {
    json!({ "step": step, "code": output.code })
}

fn step_failure(step: &str, output: &RunOutput, steps: Vec<Value>) -> ExecutionOutcome {
    ExecutionOutcome::failure(
        format!("{step} build failed (exit code {})", output.code),
        json!({
            "reason": "step_failed",
            "step": step,
            "code": output.code,
            "stdout": output.stdout,
            "stderr": output.stderr,
            "steps": steps,
        }),
    )
}

fn artifact_summary(path: &Path, root: &Path) -> Result<Value> {
    let metadata = fs::metadata(path).with_context(|| format!("inspecting {}", path.display()))?;
    Ok(json!({
        "path": relative_path_str(path, root),
        "bytes": metadata.len(),
        "sha256": compute_file_sha256(path)?,
    }))
}

fn compute_file_sha256(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).with_context(|| format!("hashing {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Most recently modified file in `dir` with the given suffix. Ties break on
/// the file name.
fn newest_artifact(dir: &Path, suffix: &str) -> Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("scanning {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(suffix) {
            continue;
        }
        let modified = entry
            .metadata()
            .ok()
            .and_then(|meta| meta.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let candidate = (modified, entry.into_path());
        newest = match newest {
            Some(current) if current >= candidate => Some(current),
            _ => Some(candidate),
        };
    }
    Ok(newest.map(|(_, path)| path))
}

fn render_argv(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

fn relative_path_str(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
