#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod api;
pub mod cmdline;
pub mod discover;
pub mod manifest;

pub use indexmap::IndexMap;

pub use cmdline::{split_command_line, substitute_words, CmdlineError, Substitutions};
pub use discover::{
    current_manifest, discover_manifest_root, locate_manifest_in, ManifestLocation, ManifestSource,
    PYPROJECT_TOML, TX_TOML,
};
pub use manifest::{
    select_environments, CommandSpec, EnvConfig, EnvManifest, ManifestError, ENV_DIR_DEFAULT,
};
