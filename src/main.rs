//! httpsync CLI entry point.

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use httpsync::cli::commands;
use httpsync::cli::{Cli, Commands};
use httpsync::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    if !cli.quiet {
        init_tracing(cli.verbose);
    }

    // Piped output is machine-read, so it gets JSON even without --json.
    let json = cli.json || !std::io::stdout().is_terminal();

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, json, cli.quiet);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
///
/// Extra `-v` flags raise httpsync's own level first; dependencies stay
/// quieter until `-vvv`.
fn verbosity_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "httpsync=info,warn",
        2 => "httpsync=debug,info",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_directives(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn report_error(error: &Error, json: bool, quiet: bool) {
    if json {
        eprintln!("{}", error.to_structured_json());
        return;
    }
    if quiet {
        return;
    }
    eprintln!("Error: {error}");
    if let Some(hint) = error.hint() {
        eprintln!("  Hint: {hint}");
    }
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    match &cli.command {
        Commands::Sync(args) => commands::sync::execute(args, cli.config.as_deref(), json, cli.quiet),
        Commands::Manifest(args) => commands::manifest::execute(args, json, cli.quiet),
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Version => commands::version::execute(json),
    }
}
