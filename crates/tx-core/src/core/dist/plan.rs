use std::path::{Path, PathBuf};

use crate::config::Config;

/// Options for `tx dist`.
#[derive(Debug, Clone, Default)]
pub struct DistRequest {
    pub out_dir: Option<PathBuf>,
    pub dry_run: bool,
}

/// The resolved build: which interpreter drives it and where artifacts land.
pub(crate) struct DistPlan {
    pub python: String,
    pub out_dir: PathBuf,
}

impl DistPlan {
    pub(crate) fn sdist_argv(&self) -> Vec<String> {
        vec![
            "setup.py".to_string(),
            "sdist".to_string(),
            "--dist-dir".to_string(),
            self.out_dir.display().to_string(),
        ]
    }

    pub(crate) fn wheel_argv(&self, sdist: &Path) -> Vec<String> {
        vec![
            "-m".to_string(),
            "pip".to_string(),
            "wheel".to_string(),
            "--no-deps".to_string(),
            "--wheel-dir".to_string(),
            self.out_dir.display().to_string(),
            sdist.display().to_string(),
        ]
    }
}

pub(crate) fn plan_distribution(root: &Path, config: &Config, request: &DistRequest) -> DistPlan {
    DistPlan {
        python: config.interpreter.python.clone(),
        out_dir: resolve_output_dir(root, request.out_dir.as_deref(), &config.artifacts.out_dir),
    }
}

/// Output directory precedence: the `--out-dir` flag, then `ARTIFACTS_DIR`,
/// then `dist`. Relative paths resolve under the project root.
pub(crate) fn resolve_output_dir(root: &Path, flag: Option<&Path>, configured: &str) -> PathBuf {
    let chosen = flag
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(configured));
    if chosen.is_absolute() {
        chosen
    } else {
        root.join(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSnapshot;

    #[test]
    fn flag_beats_configured_directory() {
        let resolved = resolve_output_dir(Path::new("/proj"), Some(Path::new("custom")), "dist");
        assert_eq!(resolved, PathBuf::from("/proj/custom"));
    }

    #[test]
    fn absolute_flag_is_taken_verbatim() {
        let resolved = resolve_output_dir(Path::new("/proj"), Some(Path::new("/tmp/out")), "dist");
        assert_eq!(resolved, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn configured_directory_resolves_under_the_root() {
        let resolved = resolve_output_dir(Path::new("/proj"), None, "build/artifacts");
        assert_eq!(resolved, PathBuf::from("/proj/build/artifacts"));
    }

    #[test]
    fn absolute_configured_directory_is_taken_verbatim() {
        let resolved = resolve_output_dir(Path::new("/proj"), None, "/srv/artifacts");
        assert_eq!(resolved, PathBuf::from("/srv/artifacts"));
    }

    #[test]
    fn plan_reads_interpreter_and_artifacts_from_config() {
        let snapshot = EnvSnapshot::testing(&[("PYTHON", "python3"), ("ARTIFACTS_DIR", "out")]);
        let config = Config::from_snapshot(&snapshot);
        let plan = plan_distribution(Path::new("/proj"), &config, &DistRequest::default());
        assert_eq!(plan.python, "python3");
        assert_eq!(plan.out_dir, PathBuf::from("/proj/out"));
        assert_eq!(
            plan.sdist_argv(),
            vec!["setup.py", "sdist", "--dist-dir", "/proj/out"]
        );
    }
}
