use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tx_domain::ENV_DIR_DEFAULT;

const PYTHON_DEFAULT: &str = "python";
const ARTIFACTS_DIR_DEFAULT: &str = "dist";

/// Flags shared by every subcommand, copied out of the parsed CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub debug: bool,
    pub json: bool,
}

/// Environment variables captured once when the command starts.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        Self {
            vars: pairs
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
        }
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Settings derived from the environment, with defaults filled in.
#[derive(Debug, Clone)]
pub struct Config {
    pub interpreter: InterpreterConfig,
    pub artifacts: ArtifactsConfig,
    pub work: WorkDirConfig,
}

/// Interpreter used to create environments and drive builds (`PYTHON`).
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub python: String,
}

/// Where distribution artifacts land unless a flag overrides it
/// (`ARTIFACTS_DIR`).
#[derive(Debug, Clone)]
pub struct ArtifactsConfig {
    pub out_dir: String,
}

/// Directory under the project root that holds managed environments
/// (`TX_WORK_DIR`).
#[derive(Debug, Clone)]
pub struct WorkDirConfig {
    pub env_root: String,
}

impl Config {
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            interpreter: InterpreterConfig {
                python: var_or(snapshot, "PYTHON", PYTHON_DEFAULT),
            },
            artifacts: ArtifactsConfig {
                out_dir: var_or(snapshot, "ARTIFACTS_DIR", ARTIFACTS_DIR_DEFAULT),
            },
            work: WorkDirConfig {
                env_root: var_or(snapshot, "TX_WORK_DIR", ENV_DIR_DEFAULT),
            },
        }
    }
}

// Empty values count as unset, matching `${VAR:-default}` expansion.
fn var_or(snapshot: &EnvSnapshot, key: &str, default: &str) -> String {
    match snapshot.var(key) {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_overrides() {
        let config = Config::from_snapshot(&EnvSnapshot::testing(&[]));
        assert_eq!(config.interpreter.python, "python");
        assert_eq!(config.artifacts.out_dir, "dist");
        assert_eq!(config.work.env_root, ".tx");
    }

    #[test]
    fn environment_overrides_take_effect() {
        let snapshot = EnvSnapshot::testing(&[
            ("PYTHON", "python3.12"),
            ("ARTIFACTS_DIR", "build/artifacts"),
            ("TX_WORK_DIR", ".work"),
        ]);
        let config = Config::from_snapshot(&snapshot);
        assert_eq!(config.interpreter.python, "python3.12");
        assert_eq!(config.artifacts.out_dir, "build/artifacts");
        assert_eq!(config.work.env_root, ".work");
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let snapshot = EnvSnapshot::testing(&[("PYTHON", ""), ("ARTIFACTS_DIR", "  ")]);
        let config = Config::from_snapshot(&snapshot);
        assert_eq!(config.interpreter.python, "python");
        assert_eq!(config.artifacts.out_dir, "dist");
    }
}
