use tx_core::api::{
    format_status_message, CommandGroup, CommandInfo, CommandStatus, ExecutionOutcome,
    GlobalOptions,
};

use crate::style::Style;

use super::details::{output_from_details, was_streamed};

/// `tx run` streams command output as it happens, so the renderer only adds
/// a closing summary. Captured output (venv creation, pip installs) is
/// replayed when a step fails, since nobody saw it the first time.
pub(super) fn handle_run_output(
    global: &GlobalOptions,
    style: &Style,
    info: &CommandInfo,
    outcome: &ExecutionOutcome,
) -> bool {
    if info.group != CommandGroup::Run {
        return false;
    }
    match outcome.status {
        CommandStatus::Ok => {
            if !global.quiet {
                let message = format_status_message(info, &outcome.message);
                println!("{}", style.status(&outcome.status, &message));
            }
            true
        }
        CommandStatus::Failure => {
            if !was_streamed(&outcome.details) {
                if let Some(stdout) = output_from_details(&outcome.details, "stdout") {
                    println!("{stdout}");
                }
                if let Some(stderr) = output_from_details(&outcome.details, "stderr") {
                    println!("{stderr}");
                }
            }
            let message = format_status_message(info, &outcome.message);
            println!("{}", style.status(&outcome.status, &message));
            true
        }
        CommandStatus::UserError => false,
    }
}
