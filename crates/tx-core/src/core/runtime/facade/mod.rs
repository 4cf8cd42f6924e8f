mod errors;
mod types;

pub use errors::{
    format_status_message, is_missing_manifest_error, manifest_error_outcome,
    missing_manifest_outcome, to_json_response, MISSING_MANIFEST_HINT, MISSING_MANIFEST_MESSAGE,
};
pub use types::CommandGroup;
