use opencode::{RunOutput, Runtime};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use opencode::plugin::try_create_watcher;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the invocation should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mode {
    Repl,
    List,
    Stdin,
    Inline(String),
    Script(PathBuf),
}

/// Parsed command-line arguments
#[derive(Debug)]
pub(crate) struct CliArgs {
    pub(crate) mode: Mode,
    pub(crate) functions: Option<PathBuf>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) json: bool,
    pub(crate) watch: bool,
    pub(crate) help: bool,
    pub(crate) version: bool,
}

/// Parse command-line arguments
pub(crate) fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs {
        mode: Mode::Repl,
        functions: None,
        config: None,
        json: false,
        watch: false,
        help: false,
        version: false,
    };

    let mut i = 1; // Skip program name
    while i < args.len() {
        match args[i].as_str() {
            "list" if cli.mode == Mode::Repl => {
                cli.mode = Mode::List;
            }
            "-f" | "--functions" => {
                i += 1;
                let dir = args.get(i).ok_or("--functions requires a directory")?;
                cli.functions = Some(PathBuf::from(dir));
            }
            "--config" => {
                i += 1;
                let file = args.get(i).ok_or("--config requires a file")?;
                cli.config = Some(PathBuf::from(file));
            }
            "--json" => {
                cli.json = true;
            }
            "-w" | "--watch" => {
                cli.watch = true;
            }
            "-c" => {
                // Everything after -c is the code
                if i + 1 >= args.len() {
                    return Err("-c requires code to run".to_string());
                }
                cli.mode = Mode::Inline(args[i + 1..].join(" "));
                break;
            }
            "-" => {
                cli.mode = Mode::Stdin;
            }
            "--help" | "-h" => {
                cli.help = true;
            }
            "--version" | "-V" => {
                cli.version = true;
            }
            flag if flag.starts_with('-') => {
                return Err(format!("unknown option '{}'", flag));
            }
            path => {
                cli.mode = Mode::Script(PathBuf::from(path));
            }
        }
        i += 1;
    }

    if cli.watch && !matches!(cli.mode, Mode::Script(_)) {
        return Err("--watch needs a script file".to_string());
    }

    Ok(cli)
}

pub(crate) fn print_help() {
    println!(
        r#"opencode {} - line-oriented scripting runtime

USAGE:
    opencode [OPTIONS]                 Start interactive REPL
    opencode [OPTIONS] <script>        Run a script file
    opencode [OPTIONS] -               Run a script read from stdin
    opencode [OPTIONS] -c <code>       Run inline code
    opencode [OPTIONS] list            List available commands
                                       (run a script named `list` as ./list)

OPTIONS:
    -f, --functions <DIR>   Directory of command units (default: ./functions)
    --config <FILE>         Config file (default: ./opencode.toml if present)
    --json                  Print {{"output": ...}} / a JSON array instead of text
    -w, --watch             Rerun the script when it or a command unit changes
    -h, --help              Show this help message
    -V, --version           Show version

ENVIRONMENT:
    OPENCODE_FUNCTIONS      Functions directory (overridden by --functions)
    RUST_LOG                Diagnostic verbosity (default: warn)

SCRIPTS:
    One command per line, arguments separated by whitespace:
        add 2 3
        echo hello world
    Blank lines are skipped. Unknown commands and failing commands are
    reported inline and the script keeps going:
        [Unknown Command] foo
        [Error] in add: <message>

COMMANDS:
    Every .wasm or .wat module in the functions directory is a command named
    after its file. The directory is reloaded on every run.
"#,
        VERSION
    );
}

pub(crate) fn print_version() {
    println!("opencode {}", VERSION);
}

fn emit(output: &RunOutput, json: bool) -> ExitCode {
    let mut stdout = io::stdout().lock();
    let written = if json {
        match serde_json::to_string(output) {
            Ok(s) => writeln!(stdout, "{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        write!(stdout, "{}", output.output)
    };

    match written.and_then(|_| stdout.flush()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run inline code from `-c`
pub(crate) fn run_code(runtime: &Runtime, code: &str, json: bool) -> ExitCode {
    emit(&runtime.run(code), json)
}

/// Run a script read from stdin
pub(crate) fn run_stdin(runtime: &Runtime, json: bool) -> ExitCode {
    let mut code = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut code) {
        eprintln!("Error: Could not read stdin: {}", e);
        return ExitCode::FAILURE;
    }
    emit(&runtime.run(&code), json)
}

/// Run a script file
pub(crate) fn run_script(runtime: &Runtime, path: &PathBuf, json: bool) -> ExitCode {
    match fs::read_to_string(path) {
        Ok(code) => emit(&runtime.run(&code), json),
        Err(e) => {
            eprintln!("Error: Could not read {}: {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}

/// Run a script, then rerun it every time the script or a unit changes
pub(crate) fn watch_script(runtime: &Runtime, path: &PathBuf, json: bool) -> ExitCode {
    let status = run_script(runtime, path, json);

    let Some(mut watcher) =
        try_create_watcher(runtime.functions_dir().to_path_buf(), &[path.clone()])
    else {
        return status;
    };

    loop {
        let changed = watcher.wait_for_changes();
        if changed.is_empty() {
            return status;
        }
        for file in &changed {
            tracing::info!(path = %file.display(), "changed");
        }
        eprintln!("--- rerunning {} ---", path.display());
        run_script(runtime, path, json);
    }
}

/// Print the available command names
pub(crate) fn list_functions(runtime: &Runtime, json: bool) -> ExitCode {
    let names = match runtime.list_functions() {
        Ok(names) => names,
        Err(e) => {
            eprintln!(
                "Error: Could not list {}: {}",
                runtime.functions_dir().display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string(&names) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    ExitCode::SUCCESS
}
