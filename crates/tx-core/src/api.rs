//! Stable façade for the CLI and other front ends.
//!
//! Everything a caller needs to drive a command lives here: build a
//! [`CommandContext`], hand a request to one of the operations, then render
//! the returned [`ExecutionOutcome`].

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
pub use crate::core::tooling::progress::{progress_enabled, ProgressReporter, ProgressSuspendGuard};
