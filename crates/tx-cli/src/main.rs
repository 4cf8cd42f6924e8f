#![deny(clippy::all, warnings)]

mod cli;
mod dispatch;
mod output;
mod style;

use clap::Parser;

use crate::cli::Cli;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    init_tracing(&cli);
    let code = dispatch::dispatch(cli);
    std::process::exit(code);
}

fn init_tracing(cli: &Cli) {
    let level = if cli.global.trace {
        "trace"
    } else if cli.global.debug {
        "debug"
    } else {
        match cli.global.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "tx_cli={level},tx_core={level},tx_domain={level}"
        ))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
