mod context;
mod settings;

pub use context::{CommandContext, CommandInfo};
pub use settings::{
    ArtifactsConfig, Config, EnvSnapshot, GlobalOptions, InterpreterConfig, WorkDirConfig,
};
