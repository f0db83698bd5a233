//! OpenCode - line-oriented scripting runtime
//!
//! Usage:
//!   opencode                Start interactive REPL
//!   opencode -c "cmd args"  Run inline code
//!   opencode script.oc      Run a script file

mod cli;
mod repl;

use cli::{parse_args, print_help, print_version, CliArgs, Mode};
use opencode::{Config, Runtime};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Diagnostics go to stderr so run output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Try 'opencode --help' for more information.");
            return ExitCode::FAILURE;
        }
    };

    if cli.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    if cli.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    let runtime = match build_runtime(&cli) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match &cli.mode {
        Mode::List => cli::list_functions(&runtime, cli.json),
        Mode::Inline(code) => cli::run_code(&runtime, code, cli.json),
        Mode::Stdin => cli::run_stdin(&runtime, cli.json),
        Mode::Script(path) if cli.watch => cli::watch_script(&runtime, path, cli.json),
        Mode::Script(path) => cli::run_script(&runtime, path, cli.json),
        Mode::Repl => match repl::run_repl(&runtime) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("REPL error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn build_runtime(cli: &CliArgs) -> Result<Runtime, opencode::ConfigError> {
    let config = Config::resolve(
        cli.config.as_deref(),
        cli.functions.clone(),
        Config::env_override(),
    )?;
    Ok(Runtime::new(config))
}
