mod details;
mod failure;
mod listing;
mod run;

use atty::Stream;
use tx_core::api::{
    format_status_message, CommandInfo, CommandStatus, ExecutionOutcome, GlobalOptions,
};

use crate::style::Style;

/// Renders an outcome for humans. The `--json` path never reaches here;
/// dispatch prints the envelope itself.
pub fn render(
    info: &CommandInfo,
    outcome: &ExecutionOutcome,
    global: &GlobalOptions,
    no_color: bool,
) {
    let style_out = Style::new(no_color, atty::is(Stream::Stdout));
    let style_err = Style::new(no_color, atty::is(Stream::Stderr));

    if run::handle_run_output(global, &style_out, info, outcome) {
        return;
    }

    match outcome.status {
        CommandStatus::Ok => {
            if global.quiet {
                return;
            }
            if listing::render_listing(&style_out, info, outcome) {
                return;
            }
            for line in details::info_lines(&outcome.details) {
                let line = format!("tx {}: {line}", info.name);
                println!("{}", style_out.info(&line));
            }
            let message = format_status_message(info, &outcome.message);
            println!("{}", style_out.status(&outcome.status, &message));
            if let Some(hint) = details::hint_from_details(&outcome.details) {
                println!("{}", style_out.info(&format!("Tip: {hint}")));
            }
        }
        CommandStatus::UserError | CommandStatus::Failure => {
            let header = format_status_message(info, &outcome.message);
            eprintln!("{}", style_err.error_header(&header));
            eprintln!();
            eprintln!("Why:");
            for reason in failure::collect_why_bullets(&outcome.details, &outcome.message) {
                eprintln!("  • {reason}");
            }
            let fixes = failure::collect_fix_bullets(&outcome.details);
            if !fixes.is_empty() {
                eprintln!();
                eprintln!("Fix:");
                for fix in fixes {
                    eprintln!("{}", style_err.fix_bullet(&format!("  • {fix}")));
                }
            }
            if let Some(stdout) = details::output_from_details(&outcome.details, "stdout") {
                eprintln!();
                eprintln!("stdout:");
                eprintln!("{stdout}");
            }
            if let Some(stderr) = details::output_from_details(&outcome.details, "stderr") {
                eprintln!();
                eprintln!("stderr:");
                eprintln!("{stderr}");
            }
        }
    }
}
