use clap::CommandFactory;
use serde_json::Value;

use tx_core::api::{
    build_distributions, init_manifest, is_missing_manifest_error, list_environments,
    manifest_error_outcome, missing_manifest_outcome, run_environments, show_environment,
    to_json_response, CommandContext, CommandGroup, CommandInfo, CommandStatus, DistRequest,
    ExecutionOutcome, GlobalOptions, RunRequest, ShowRequest,
};

use crate::cli::{Cli, Command};
use crate::output;

pub fn dispatch(cli: Cli) -> i32 {
    let global = GlobalOptions {
        quiet: cli.global.quiet,
        verbose: cli.global.verbose,
        trace: cli.global.trace,
        debug: cli.global.debug,
        json: cli.global.json,
    };
    let no_color = cli.global.no_color;
    let ctx = CommandContext::new(global);

    let (info, result) = match cli.command {
        Command::Run(args) => (
            CommandInfo::new(CommandGroup::Run, "run"),
            run_environments(
                &ctx,
                &RunRequest {
                    envs: args.envs,
                    posargs: args.posargs,
                },
            ),
        ),
        Command::List => (
            CommandInfo::new(CommandGroup::List, "list"),
            list_environments(&ctx),
        ),
        Command::Show(args) => (
            CommandInfo::new(CommandGroup::Show, "show"),
            show_environment(&ctx, &ShowRequest { env: args.env }),
        ),
        Command::Dist(args) => (
            CommandInfo::new(CommandGroup::Dist, "dist"),
            build_distributions(
                &ctx,
                &DistRequest {
                    out_dir: args.out_dir,
                    dry_run: args.dry_run,
                },
            ),
        ),
        Command::Init => (
            CommandInfo::new(CommandGroup::Init, "init"),
            init_manifest(&ctx),
        ),
        Command::Completions(args) => {
            let mut command = Cli::command();
            clap_complete::generate(args.shell, &mut command, "tx", &mut std::io::stdout());
            return 0;
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => classify_error(&err),
    };

    if ctx.global.json {
        match serde_json::to_string(&to_json_response(&info, &outcome)) {
            Ok(body) => println!("{body}"),
            Err(err) => {
                eprintln!("tx: failed to encode JSON output: {err}");
                return 2;
            }
        }
    } else {
        output::render(&info, &outcome, &ctx.global, no_color);
    }
    exit_code_for(&info, &outcome)
}

/// Errors bubbling out of an operation become outcomes here: manifest
/// problems turn into user errors, anything else stays a failure with its
/// cause chain attached.
fn classify_error(err: &anyhow::Error) -> ExecutionOutcome {
    if is_missing_manifest_error(err) {
        return missing_manifest_outcome();
    }
    if let Some(outcome) = manifest_error_outcome(err) {
        return outcome;
    }
    let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
    ExecutionOutcome::failure(err.to_string(), serde_json::json!({ "issues": issues }))
}

/// Success is 0, user errors 1, failures 2. When a run or dist child exited
/// non-zero, its code wins so callers see what the underlying tool reported.
fn exit_code_for(info: &CommandInfo, outcome: &ExecutionOutcome) -> i32 {
    let base = match outcome.status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    };
    if base != 0 && matches!(info.group, CommandGroup::Run | CommandGroup::Dist) {
        if let Some(code) = outcome.details.get("code").and_then(Value::as_i64) {
            if code != 0 {
                return i32::try_from(code).unwrap_or(base);
            }
        }
    }
    base
}
