use std::path::{Path, PathBuf};

use anyhow::Result;
use tx_domain::{substitute_words, EnvConfig, Substitutions};

use crate::config::Config;

/// One environment resolved against the project: where it lives and which
/// interpreter seeds it.
pub(crate) struct EnvRunPlan<'m> {
    pub env: &'m EnvConfig,
    pub envdir: PathBuf,
    pub interpreter: String,
}

pub(crate) fn plan_environment<'m>(
    root: &Path,
    config: &Config,
    env: &'m EnvConfig,
) -> EnvRunPlan<'m> {
    let envdir = root.join(&config.work.env_root).join(&env.name);
    let interpreter = env
        .python
        .clone()
        .unwrap_or_else(|| config.interpreter.python.clone());
    EnvRunPlan {
        env,
        envdir,
        interpreter,
    }
}

impl EnvRunPlan<'_> {
    /// Expands every command into argv form with placeholders resolved.
    pub(crate) fn resolved_commands(
        &self,
        root: &Path,
        posargs: &[String],
    ) -> Result<Vec<Vec<String>>> {
        let envdir = self.envdir.display().to_string();
        let rootdir = root.display().to_string();
        let subs = Substitutions {
            envname: &self.env.name,
            envdir: &envdir,
            rootdir: &rootdir,
            posargs,
        };
        let mut resolved = Vec::with_capacity(self.env.commands.len());
        for command in &self.env.commands {
            let words = command.words()?;
            resolved.push(substitute_words(&words, &subs)?);
        }
        Ok(resolved)
    }

    pub(crate) fn bin_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.envdir.join("Scripts")
        } else {
            self.envdir.join("bin")
        }
    }

    pub(crate) fn env_python(&self) -> PathBuf {
        let name = if cfg!(windows) { "python.exe" } else { "python" };
        self.bin_dir().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSnapshot;
    use tx_domain::CommandSpec;

    fn test_env(name: &str, python: Option<&str>) -> EnvConfig {
        EnvConfig {
            name: name.to_string(),
            description: None,
            deps: Vec::new(),
            commands: vec![CommandSpec::Line(
                "pytest {posargs} --rootdir {rootdir}".to_string(),
            )],
            passenv: Vec::new(),
            setenv: tx_domain::IndexMap::default(),
            isolated: true,
            python: python.map(ToString::to_string),
        }
    }

    fn test_config(pairs: &[(&str, &str)]) -> Config {
        Config::from_snapshot(&EnvSnapshot::testing(pairs))
    }

    #[test]
    fn envdir_lives_under_the_work_root() {
        let env = test_env("tests", None);
        let plan = plan_environment(Path::new("/proj"), &test_config(&[]), &env);
        assert_eq!(plan.envdir, PathBuf::from("/proj/.tx/tests"));
    }

    #[test]
    fn work_root_override_moves_the_envdir() {
        let env = test_env("tests", None);
        let config = test_config(&[("TX_WORK_DIR", ".cache/tx")]);
        let plan = plan_environment(Path::new("/proj"), &config, &env);
        assert_eq!(plan.envdir, PathBuf::from("/proj/.cache/tx/tests"));
    }

    #[test]
    fn environment_interpreter_beats_the_default() {
        let env = test_env("tests", Some("python3.8"));
        let config = test_config(&[("PYTHON", "python3.12")]);
        let plan = plan_environment(Path::new("/proj"), &config, &env);
        assert_eq!(plan.interpreter, "python3.8");
        let plain = test_env("lint", None);
        let plan = plan_environment(Path::new("/proj"), &config, &plain);
        assert_eq!(plan.interpreter, "python3.12");
    }

    #[test]
    fn resolved_commands_expand_placeholders() {
        let env = test_env("tests", None);
        let plan = plan_environment(Path::new("/proj"), &test_config(&[]), &env);
        let posargs = vec!["-k".to_string(), "fast".to_string()];
        let commands = plan.resolved_commands(Path::new("/proj"), &posargs).unwrap();
        assert_eq!(
            commands,
            vec![vec![
                "pytest".to_string(),
                "-k".to_string(),
                "fast".to_string(),
                "--rootdir".to_string(),
                "/proj".to_string(),
            ]]
        );
    }
}
