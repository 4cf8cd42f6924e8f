use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;

pub const TX_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const TX_BEFORE_HELP: &str = concat!(
    "tx ",
    env!("CARGO_PKG_VERSION"),
    " - task environments and packaging for Python projects\n\n",
    "  run          Create the venv, sync requirements, run the commands.\n",
    "  list         List declared environments.\n",
    "  show         Show one environment's resolved configuration.\n",
    "  dist         Build an sdist, then a wheel from that sdist.\n",
    "  init         Write a starter tx.toml.\n",
    "  completions  Generate shell completions.\n",
);

#[derive(Debug, Parser)]
#[command(
    name = "tx",
    version,
    arg_required_else_help = true,
    disable_help_subcommand = true,
    before_help = TX_BEFORE_HELP,
    help_template = TX_HELP_TEMPLATE
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalFlags {
    /// Suppress non-essential output.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Increase log verbosity (repeatable).
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log debug detail to stderr.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log trace detail to stderr.
    #[arg(long, global = true)]
    pub trace: bool,

    /// Print the result as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run environments from the manifest.
    Run(RunArgs),
    /// List declared environments.
    List,
    /// Show one environment in detail.
    Show(ShowArgs),
    /// Build the sdist and a wheel from it.
    Dist(DistArgs),
    /// Write a starter tx.toml.
    Init,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Environments to run, comma-joined or repeated. Defaults to the
    /// manifest's envlist.
    #[arg(value_name = "ENV")]
    pub envs: Vec<String>,

    /// Arguments spliced into `{posargs}`, after `--`.
    #[arg(last = true, value_name = "ARGS")]
    pub posargs: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Environment name.
    #[arg(value_name = "ENV")]
    pub env: String,
}

#[derive(Debug, Args)]
pub struct DistArgs {
    /// Directory for built artifacts. Defaults to ARTIFACTS_DIR or `dist`.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Print the build steps without running them.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    pub shell: Shell,
}
