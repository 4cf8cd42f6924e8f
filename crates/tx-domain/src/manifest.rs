//! The environment manifest: named task environments, each mapping to a
//! dependency set and a command sequence.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use pep508_rs::Requirement as PepRequirement;
use thiserror::Error;
use toml_edit::{DocumentMut, Item, TableLike, Value};

use crate::cmdline::{split_command_line, substitute_words, Substitutions};
use crate::discover::{current_manifest, ManifestLocation, ManifestSource};

/// Directory under the project root holding per-environment working trees.
pub const ENV_DIR_DEFAULT: &str = ".tx";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("environment `{env}`: {problem}")]
    InvalidEnv { env: String, problem: String },
    #[error("{problem}")]
    Invalid { problem: String },
    #[error("unknown environment `{name}`")]
    UnknownEnvironment { name: String, available: Vec<String> },
}

/// One command of an environment's command sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandSpec {
    /// A command line split with shell-style quoting rules.
    Line(String),
    /// A pre-split argv.
    Argv(Vec<String>),
}

impl CommandSpec {
    /// Returns the command as argv words, placeholders intact.
    pub fn words(&self) -> Result<Vec<String>> {
        match self {
            CommandSpec::Line(line) => Ok(split_command_line(line)?),
            CommandSpec::Argv(words) => Ok(words.clone()),
        }
    }

    /// One-line rendering for listings and logs.
    pub fn display_line(&self) -> String {
        match self {
            CommandSpec::Line(line) => line.clone(),
            CommandSpec::Argv(words) => words.join(" "),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnvConfig {
    pub name: String,
    pub description: Option<String>,
    pub deps: Vec<String>,
    pub commands: Vec<CommandSpec>,
    pub passenv: Vec<String>,
    pub setenv: IndexMap<String, String>,
    pub isolated: bool,
    pub python: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EnvManifest {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub source: ManifestSource,
    pub envlist: Vec<String>,
    pub envs: IndexMap<String, EnvConfig>,
}

impl EnvManifest {
    pub fn read_current() -> Result<Self> {
        let location = current_manifest()?;
        Self::read_from(&location)
    }

    pub fn read_from(location: &ManifestLocation) -> Result<Self> {
        let contents = fs::read_to_string(&location.path)
            .with_context(|| format!("reading {}", location.path.display()))?;
        Self::parse(&contents, location)
    }

    pub fn parse(contents: &str, location: &ManifestLocation) -> Result<Self> {
        let doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("parsing {}", location.path.display()))?;

        let (settings, env_tables) = match location.source {
            ManifestSource::TxToml => (
                doc.get("tx").and_then(Item::as_table_like),
                doc.get("env").and_then(Item::as_table_like),
            ),
            ManifestSource::Pyproject => {
                let tool_tx = doc
                    .get("tool")
                    .and_then(Item::as_table_like)
                    .and_then(|tool| tool.get("tx"))
                    .and_then(Item::as_table_like);
                (tool_tx, tool_tx.and_then(|tx| tx.get("env")).and_then(Item::as_table_like))
            }
        };

        let envlist = parse_envlist(settings)?;

        let mut envs = IndexMap::new();
        if let Some(tables) = env_tables {
            for (name, item) in tables.iter() {
                let env = parse_env(name, item)?;
                envs.insert(name.to_string(), env);
            }
        }

        for name in &envlist {
            if !envs.contains_key(name) {
                return Err(ManifestError::Invalid {
                    problem: format!("`envlist` names undeclared environment `{name}`"),
                }
                .into());
            }
        }

        Ok(Self {
            root: location.root.clone(),
            manifest_path: location.path.clone(),
            source: location.source,
            envlist,
            envs,
        })
    }

    pub fn env(&self, name: &str) -> Option<&EnvConfig> {
        self.envs.get(name)
    }

    pub fn env_names(&self) -> Vec<String> {
        self.envs.keys().cloned().collect()
    }
}

/// Resolves requested environment names against the manifest.
///
/// With no names, `envlist` decides the order; without an `envlist`, every
/// declared environment runs in declaration order. Names may be comma-joined
/// and duplicates collapse to their first occurrence.
pub fn select_environments<'m>(
    manifest: &'m EnvManifest,
    requested: &[String],
) -> Result<Vec<&'m EnvConfig>> {
    let names: Vec<String> = if requested.is_empty() {
        if manifest.envlist.is_empty() {
            manifest.env_names()
        } else {
            manifest.envlist.clone()
        }
    } else {
        requested
            .iter()
            .flat_map(|arg| arg.split(','))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .collect()
    };

    let mut selected: Vec<&EnvConfig> = Vec::new();
    for name in &names {
        let env = manifest
            .env(name)
            .ok_or_else(|| ManifestError::UnknownEnvironment {
                name: name.clone(),
                available: manifest.env_names(),
            })?;
        if !selected.iter().any(|chosen| chosen.name == env.name) {
            selected.push(env);
        }
    }
    Ok(selected)
}

fn parse_envlist(settings: Option<&dyn TableLike>) -> Result<Vec<String>> {
    let Some(item) = settings.and_then(|table| table.get("envlist")) else {
        return Ok(Vec::new());
    };
    parse_string_array(Some(item), "envlist").map_err(|problem| {
        anyhow::Error::from(ManifestError::Invalid { problem })
    })
}

fn invalid_env(name: &str, problem: impl Into<String>) -> anyhow::Error {
    ManifestError::InvalidEnv {
        env: name.to_string(),
        problem: problem.into(),
    }
    .into()
}

fn parse_env(name: &str, item: &Item) -> Result<EnvConfig> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ManifestError::Invalid {
            problem: format!("environment name `{name}` is not usable as a directory name"),
        }
        .into());
    }

    let table = item
        .as_table_like()
        .ok_or_else(|| invalid_env(name, "environment entry must be a table"))?;

    let description = table
        .get("description")
        .map(|item| {
            item.as_str()
                .map(ToString::to_string)
                .ok_or_else(|| invalid_env(name, "`description` must be a string"))
        })
        .transpose()?;

    let deps = parse_string_array(table.get("deps"), "deps")
        .map_err(|problem| invalid_env(name, problem))?;
    for dep in &deps {
        if let Err(err) = PepRequirement::from_str(dep.trim()) {
            return Err(invalid_env(name, format!("invalid requirement `{dep}`: {err}")));
        }
    }

    let commands =
        parse_commands(table.get("commands")).map_err(|problem| invalid_env(name, problem))?;
    if commands.is_empty() {
        return Err(invalid_env(name, "declares no commands"));
    }

    let passenv = parse_string_array(table.get("passenv"), "passenv")
        .map_err(|problem| invalid_env(name, problem))?;
    for pattern in &passenv {
        if pattern.is_empty() {
            return Err(invalid_env(name, "`passenv` entries must be non-empty"));
        }
    }

    let setenv =
        parse_setenv(table.get("setenv")).map_err(|problem| invalid_env(name, problem))?;

    let isolated = match table.get("isolated") {
        None => true,
        Some(item) => item
            .as_bool()
            .ok_or_else(|| invalid_env(name, "`isolated` must be a boolean"))?,
    };
    if !isolated && !deps.is_empty() {
        return Err(invalid_env(name, "`isolated = false` requires `deps` to be empty"));
    }

    let python = table
        .get("python")
        .map(|item| {
            item.as_str()
                .map(ToString::to_string)
                .ok_or_else(|| invalid_env(name, "`python` must be a string"))
        })
        .transpose()?;

    let env = EnvConfig {
        name: name.to_string(),
        description,
        deps,
        commands,
        passenv,
        setenv,
        isolated,
        python,
    };
    validate_commands(&env).map_err(|problem| invalid_env(name, problem))?;
    Ok(env)
}

// Probe substitution at load time so runs never trip over a placeholder.
fn validate_commands(env: &EnvConfig) -> std::result::Result<(), String> {
    let probe = Substitutions {
        envname: &env.name,
        envdir: "",
        rootdir: "",
        posargs: &[],
    };
    for spec in &env.commands {
        let words = spec.words().map_err(|err| err.to_string())?;
        if words.is_empty() {
            return Err(format!("command `{}` is empty", spec.display_line()));
        }
        substitute_words(&words, &probe).map_err(|err| {
            format!("command `{}`: {err}", spec.display_line())
        })?;
    }
    Ok(())
}

fn parse_commands(item: Option<&Item>) -> std::result::Result<Vec<CommandSpec>, String> {
    let Some(item) = item else {
        return Ok(Vec::new());
    };
    let array = item
        .as_array()
        .ok_or_else(|| "`commands` must be an array".to_string())?;
    let mut commands = Vec::new();
    for entry in array {
        match entry {
            Value::String(formatted) => {
                commands.push(CommandSpec::Line(formatted.value().clone()));
            }
            Value::Array(argv) => {
                let mut words = Vec::new();
                for value in argv {
                    let word = value
                        .as_str()
                        .ok_or_else(|| "argv command entries must be strings".to_string())?;
                    words.push(word.to_string());
                }
                commands.push(CommandSpec::Argv(words));
            }
            _ => {
                return Err("`commands` entries must be strings or arrays of strings".to_string())
            }
        }
    }
    Ok(commands)
}

fn parse_string_array(item: Option<&Item>, key: &str) -> std::result::Result<Vec<String>, String> {
    let Some(item) = item else {
        return Ok(Vec::new());
    };
    let array = item
        .as_array()
        .ok_or_else(|| format!("`{key}` must be an array of strings"))?;
    let mut values = Vec::new();
    for value in array {
        let literal = value
            .as_str()
            .ok_or_else(|| format!("`{key}` entries must be strings"))?;
        values.push(literal.to_string());
    }
    Ok(values)
}

fn parse_setenv(item: Option<&Item>) -> std::result::Result<IndexMap<String, String>, String> {
    let Some(item) = item else {
        return Ok(IndexMap::new());
    };
    let table = item
        .as_table_like()
        .ok_or_else(|| "`setenv` must be a table of strings".to_string())?;
    let mut pairs = IndexMap::new();
    for (key, value) in table.iter() {
        let literal = value
            .as_str()
            .ok_or_else(|| format!("`setenv.{key}` must be a string"))?;
        pairs.insert(key.to_string(), literal.to_string());
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn location(source: ManifestSource) -> ManifestLocation {
        let file = match source {
            ManifestSource::TxToml => "tx.toml",
            ManifestSource::Pyproject => "pyproject.toml",
        };
        ManifestLocation {
            root: PathBuf::from("/work"),
            path: Path::new("/work").join(file),
            source,
        }
    }

    fn parse_tx(contents: &str) -> Result<EnvManifest> {
        EnvManifest::parse(contents, &location(ManifestSource::TxToml))
    }

    #[test]
    fn parses_full_schema() {
        let manifest = parse_tx(
            r#"
[tx]
envlist = ["tests", "lint"]

[env.tests]
description = "unit test suite"
deps = ["pytest>=7", "pytest-cov"]
commands = [
    "pytest {posargs}",
    ["coverage", "report"],
]

[env.lint]
deps = ["flake8"]
commands = ["flake8 src"]
passenv = ["CI", "MYPY_*"]
python = "python3.11"

[env.lint.setenv]
MYPYPATH = "src"
"#,
        )
        .unwrap();

        assert_eq!(manifest.envlist, vec!["tests", "lint"]);
        assert_eq!(manifest.env_names(), vec!["tests", "lint"]);

        let tests = manifest.env("tests").unwrap();
        assert_eq!(tests.description.as_deref(), Some("unit test suite"));
        assert_eq!(tests.deps, vec!["pytest>=7", "pytest-cov"]);
        assert_eq!(
            tests.commands,
            vec![
                CommandSpec::Line("pytest {posargs}".to_string()),
                CommandSpec::Argv(vec!["coverage".to_string(), "report".to_string()]),
            ]
        );
        assert!(tests.isolated);

        let lint = manifest.env("lint").unwrap();
        assert_eq!(lint.passenv, vec!["CI", "MYPY_*"]);
        assert_eq!(lint.setenv.get("MYPYPATH").map(String::as_str), Some("src"));
        assert_eq!(lint.python.as_deref(), Some("python3.11"));
    }

    #[test]
    fn parses_tool_tx_table_in_pyproject() {
        let manifest = EnvManifest::parse(
            r#"
[project]
name = "demo"

[tool.tx]
envlist = ["tests"]

[tool.tx.env.tests]
commands = ["pytest"]
"#,
            &location(ManifestSource::Pyproject),
        )
        .unwrap();

        assert_eq!(manifest.envlist, vec!["tests"]);
        assert!(manifest.env("tests").is_some());
    }

    #[test]
    fn environments_keep_declaration_order() {
        let manifest = parse_tx(
            r#"
[env.zeta]
commands = ["true"]

[env.alpha]
commands = ["true"]
"#,
        )
        .unwrap();
        assert_eq!(manifest.env_names(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn rejects_invalid_requirement() {
        let err = parse_tx(
            r#"
[env.tests]
deps = ["pytest >=== 7"]
commands = ["pytest"]
"#,
        )
        .unwrap_err();
        let manifest_err = err.downcast_ref::<ManifestError>().unwrap();
        assert!(matches!(manifest_err, ManifestError::InvalidEnv { env, .. } if env == "tests"));
    }

    #[test]
    fn rejects_environment_without_commands() {
        let err = parse_tx("[env.tests]\ndeps = [\"pytest\"]\n").unwrap_err();
        assert!(err.to_string().contains("declares no commands"));
    }

    #[test]
    fn rejects_unknown_placeholder_at_load_time() {
        let err = parse_tx(
            r#"
[env.tests]
commands = ["pytest {workdir}"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown placeholder"));
    }

    #[test]
    fn rejects_unterminated_quote_at_load_time() {
        let err = parse_tx(
            r#"
[env.tests]
commands = ["sh -c 'oops"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unterminated quote"));
    }

    #[test]
    fn rejects_deps_without_isolation() {
        let err = parse_tx(
            r#"
[env.tests]
deps = ["pytest"]
commands = ["pytest"]
isolated = false
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("requires `deps` to be empty"));
    }

    #[test]
    fn rejects_envlist_with_undeclared_name() {
        let err = parse_tx(
            r#"
[tx]
envlist = ["missing"]

[env.tests]
commands = ["pytest"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("undeclared environment `missing`"));
    }

    #[test]
    fn rejects_env_name_with_path_separator() {
        let err = parse_tx("[env.\"a/b\"]\ncommands = [\"true\"]\n").unwrap_err();
        assert!(err.to_string().contains("not usable as a directory name"));
    }

    #[test]
    fn selection_defaults_to_envlist() {
        let manifest = parse_tx(
            r#"
[tx]
envlist = ["lint"]

[env.tests]
commands = ["pytest"]

[env.lint]
commands = ["flake8"]
"#,
        )
        .unwrap();
        let selected = select_environments(&manifest, &[]).unwrap();
        let names: Vec<&str> = selected.iter().map(|env| env.name.as_str()).collect();
        assert_eq!(names, vec!["lint"]);
    }

    #[test]
    fn selection_without_envlist_runs_everything() {
        let manifest = parse_tx(
            r#"
[env.tests]
commands = ["pytest"]

[env.lint]
commands = ["flake8"]
"#,
        )
        .unwrap();
        let selected = select_environments(&manifest, &[]).unwrap();
        let names: Vec<&str> = selected.iter().map(|env| env.name.as_str()).collect();
        assert_eq!(names, vec!["tests", "lint"]);
    }

    #[test]
    fn selection_splits_commas_and_dedupes() {
        let manifest = parse_tx(
            r#"
[env.tests]
commands = ["pytest"]

[env.lint]
commands = ["flake8"]
"#,
        )
        .unwrap();
        let requested = vec!["lint,tests".to_string(), "lint".to_string()];
        let selected = select_environments(&manifest, &requested).unwrap();
        let names: Vec<&str> = selected.iter().map(|env| env.name.as_str()).collect();
        assert_eq!(names, vec!["lint", "tests"]);
    }

    #[test]
    fn selection_reports_unknown_environment() {
        let manifest = parse_tx("[env.tests]\ncommands = [\"pytest\"]\n").unwrap();
        let requested = vec!["docs".to_string()];
        let err = select_environments(&manifest, &requested).unwrap_err();
        match err.downcast_ref::<ManifestError>().unwrap() {
            ManifestError::UnknownEnvironment { name, available } => {
                assert_eq!(name, "docs");
                assert_eq!(available, &vec!["tests".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
