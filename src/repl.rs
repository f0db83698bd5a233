use opencode::Runtime;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

/// History file (~/.opencode_history)
fn history_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".opencode_history"))
}

/// What the REPL does with one line of input
#[derive(Debug, PartialEq, Eq)]
enum ReplAction<'a> {
    Skip,
    Exit,
    Help,
    Functions,
    Run(&'a str),
}

fn classify(line: &str) -> ReplAction<'_> {
    match line.trim() {
        "" => ReplAction::Skip,
        "exit" | "quit" => ReplAction::Exit,
        ".help" | ".h" => ReplAction::Help,
        ".functions" | ".f" => ReplAction::Functions,
        other => ReplAction::Run(other),
    }
}

fn print_repl_help() {
    println!(
        r#"Each line runs as its own script against freshly loaded commands.

    <command> <args...>     Run a command
    .functions, .f          List available commands
    .help, .h               Show this help
    exit, quit              Exit the REPL"#
    );
}

/// Run the interactive REPL
pub(crate) fn run_repl(runtime: &Runtime) -> RlResult<()> {
    let mut rl = DefaultEditor::new()?;

    let history = history_path();
    if let Some(ref path) = history {
        let _ = rl.load_history(path);
    }

    println!(
        "opencode {} (functions: {}) - .help for help",
        env!("CARGO_PKG_VERSION"),
        runtime.functions_dir().display()
    );

    loop {
        match rl.readline("oc> ") {
            Ok(line) => {
                let action = classify(&line);
                if action != ReplAction::Skip {
                    let _ = rl.add_history_entry(line.trim());
                }

                match action {
                    ReplAction::Skip => {}
                    ReplAction::Exit => break,
                    ReplAction::Help => print_repl_help(),
                    ReplAction::Functions => match runtime.list_functions() {
                        Ok(names) if names.is_empty() => println!("(no commands)"),
                        Ok(names) => println!("{}", names.join("  ")),
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    ReplAction::Run(code) => {
                        let result = runtime.run(code);
                        print!("{}", result.output);
                        if !result.output.is_empty() && !result.output.ends_with('\n') {
                            println!();
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        }
    }

    if let Some(ref path) = history {
        let _ = rl.save_history(path);
    }
    Ok(())
}
