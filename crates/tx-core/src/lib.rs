#![deny(clippy::all, warnings)]

mod core;

pub mod api;

pub(crate) use crate::core::config;
pub(crate) use crate::core::runtime::process;
pub(crate) use crate::core::tooling::{outcome, progress};

pub use crate::core::config::{
    ArtifactsConfig, CommandContext, CommandInfo, Config, EnvSnapshot, GlobalOptions,
    InterpreterConfig, WorkDirConfig,
};
pub use crate::core::dist::{build_distributions, DistRequest};
pub use crate::core::envs::{
    init_manifest, list_environments, run_environments, show_environment, RunRequest, ShowRequest,
};
pub use crate::core::runtime::facade::{
    format_status_message, is_missing_manifest_error, manifest_error_outcome,
    missing_manifest_outcome, to_json_response, CommandGroup, MISSING_MANIFEST_HINT,
    MISSING_MANIFEST_MESSAGE,
};
pub use crate::core::runtime::process::{run_command, run_command_streaming, ChildEnv, RunOutput};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
pub use crate::core::tooling::progress::{
    progress_enabled, ProgressReporter, ProgressSuspendGuard,
};
