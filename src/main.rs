use bsl::{Diagnostic, FormResult, evaluate_source, print};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run a Beginning Student Language program and print the result of every
/// top-level form.
#[derive(Parser, Debug)]
#[command(name = "bsl", version, about)]
struct Args {
    /// Program to run. Reads standard input when missing or `-`.
    file: Option<PathBuf>,

    /// Also report every failing form on stderr, with its source location.
    #[arg(long)]
    diagnostics: bool,

    /// Exit with status 1 if any form errors or any test fails.
    #[arg(long)]
    strict: bool,
}

fn read_program(file: Option<&PathBuf>) -> io::Result<(String, String)> {
    match file {
        Some(path) if path.as_os_str() != "-" => {
            Ok((path.display().to_string(), fs::read_to_string(path)?))
        }
        _ => {
            let mut buffer = String::new();
            io::stdin().lock().read_to_string(&mut buffer)?;
            Ok(("<stdin>".to_string(), buffer))
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let (name, source) = match read_program(args.file.as_ref()) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("bsl: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcomes = evaluate_source(&source);
    tracing::debug!(file = %name, forms = outcomes.len(), "ran program");

    let results: Vec<FormResult> = outcomes.iter().map(|o| o.result.clone()).collect();
    print!("{}", print(&results));

    if args.diagnostics {
        for diagnostic in outcomes.iter().filter_map(Diagnostic::from_outcome) {
            if let Err(e) = diagnostic.report(&name, &source) {
                eprintln!("bsl: could not write report: {}", e);
            }
        }
    }

    if args.strict && results.iter().any(FormResult::is_failure) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
