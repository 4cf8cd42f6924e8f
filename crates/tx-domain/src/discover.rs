//! Locating the environment manifest for the current project.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use toml_edit::DocumentMut;

pub const TX_TOML: &str = "tx.toml";
pub const PYPROJECT_TOML: &str = "pyproject.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestSource {
    TxToml,
    Pyproject,
}

impl ManifestSource {
    pub fn file_name(self) -> &'static str {
        match self {
            ManifestSource::TxToml => TX_TOML,
            ManifestSource::Pyproject => PYPROJECT_TOML,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ManifestLocation {
    pub root: PathBuf,
    pub path: PathBuf,
    pub source: ManifestSource,
}

/// Resolves the manifest for the current working directory.
pub fn current_manifest() -> Result<ManifestLocation> {
    match discover_manifest_root()? {
        Some(location) => Ok(location),
        None => Err(anyhow!(
            "No tx manifest found. Run `tx init` in your project directory first."
        )),
    }
}

/// Walks upward from the working directory until a manifest is found.
pub fn discover_manifest_root() -> Result<Option<ManifestLocation>> {
    let mut dir = env::current_dir().context("unable to determine working directory")?;
    loop {
        if let Some(location) = locate_manifest_in(&dir)? {
            return Ok(Some(location));
        }
        if !dir.pop() {
            break;
        }
    }
    Ok(None)
}

/// Checks one directory for `tx.toml`, then for `pyproject.toml` carrying a
/// `[tool.tx]` table.
pub fn locate_manifest_in(dir: &Path) -> Result<Option<ManifestLocation>> {
    let tx_toml = dir.join(TX_TOML);
    if tx_toml.exists() {
        return Ok(Some(ManifestLocation {
            root: dir.to_path_buf(),
            path: tx_toml,
            source: ManifestSource::TxToml,
        }));
    }
    let pyproject = dir.join(PYPROJECT_TOML);
    if pyproject.exists() && pyproject_has_tool_tx(&pyproject)? {
        return Ok(Some(ManifestLocation {
            root: dir.to_path_buf(),
            path: pyproject,
            source: ManifestSource::Pyproject,
        }));
    }
    Ok(None)
}

fn pyproject_has_tool_tx(path: &Path) -> Result<bool> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc: DocumentMut = contents
        .parse()
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(doc
        .get("tool")
        .and_then(|item| item.as_table())
        .and_then(|table| table.get("tx"))
        .is_some())
}
