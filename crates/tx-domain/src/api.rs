// Intended public API surface for `tx-domain`.
//
// This module exists to make it explicit which types and functions are part
// of the stable interface consumed by `tx-core` and the CLI.

pub use indexmap::IndexMap;

pub use crate::cmdline::{split_command_line, substitute_words, CmdlineError, Substitutions};
pub use crate::discover::{
    current_manifest, discover_manifest_root, locate_manifest_in, ManifestLocation, ManifestSource,
    PYPROJECT_TOML, TX_TOML,
};
pub use crate::manifest::{
    select_environments, CommandSpec, EnvConfig, EnvManifest, ManifestError, ENV_DIR_DEFAULT,
};
