mod exec;
mod listing;
mod plan;
mod prepare;
mod scaffold;

pub use exec::{run_environments, RunRequest};
pub use listing::{list_environments, show_environment, ShowRequest};
pub use scaffold::init_manifest;
