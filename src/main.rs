use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Compiler and stack-machine interpreter for a small MiniJava-like language.
#[derive(Parser, Debug)]
struct Cli {
    input: PathBuf,

    /// Print a bytecode listing after compilation, before execution.
    #[arg(long)]
    emit_bc: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: {}", cli.input.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let stdout = std::io::stdout();
    match minijava::run(&source, cli.emit_bc, stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
