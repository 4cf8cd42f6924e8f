use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;
use tx_domain::{current_manifest, EnvManifest, ManifestLocation};

use crate::config::{Config, EnvSnapshot, GlobalOptions};
use crate::core::runtime::facade::CommandGroup;

/// Identifies the running command for status prefixes and JSON envelopes.
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

/// Shared state for one command invocation.
///
/// Manifest discovery walks up from the working directory and is cached for
/// the lifetime of the command; the manifest itself is re-read on demand.
pub struct CommandContext {
    pub global: GlobalOptions,
    config: Config,
    manifest_location: OnceLock<ManifestLocation>,
}

impl CommandContext {
    pub fn new(global: GlobalOptions) -> Self {
        let snapshot = EnvSnapshot::capture();
        let config = Config::from_snapshot(&snapshot);
        Self {
            global,
            config,
            manifest_location: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// # Errors
    /// Fails when no manifest exists in the working directory or any parent.
    pub fn manifest_location(&self) -> Result<&ManifestLocation> {
        if let Some(location) = self.manifest_location.get() {
            return Ok(location);
        }
        let location = current_manifest()?;
        Ok(self.manifest_location.get_or_init(|| location))
    }

    /// # Errors
    /// Fails when the manifest is missing, unreadable or invalid.
    pub fn manifest(&self) -> Result<EnvManifest> {
        let location = self.manifest_location()?;
        EnvManifest::read_from(location)
    }

    /// # Errors
    /// Fails when no manifest exists in the working directory or any parent.
    pub fn project_root(&self) -> Result<&Path> {
        Ok(self.manifest_location()?.root.as_path())
    }
}
