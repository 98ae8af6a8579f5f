//! `weave` command-line interface: a thin shell around [`Program`] and
//! [`Weave`] for running scripts, checking them for errors, and stepping
//! through one line at a time.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::WeaveError;
use crate::program::Program;
use crate::weave::Weave;

const DEFAULT_MAX_ITERATIONS: usize = 100_000;

#[derive(Parser)]
#[command(name = "weave")]
#[command(about = "Lexer, parser, lowering pass and stepping executor for the weave scripting language")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile and run a script to completion, feeding feedback prompts
    /// from stdin when a command suspends.
    Run {
        /// Path to the script file.
        path: PathBuf,

        /// Maximum number of dispatcher steps before giving up.
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,

        /// Emit each step's result as a line of JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },

    /// Compile a script and report the first syntax/lowering error, if any.
    Check {
        /// Path to the script file.
        path: PathBuf,
    },

    /// Read one line at a time from stdin, feeding each into a shared
    /// weave + stepper and printing one result per line.
    Repl,
}

/// Parse `std::env::args`, dispatch to the matching subcommand, and
/// return a displayable error on failure. Installs a `tracing` subscriber
/// gated by `RUST_LOG`; library code never installs one itself.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { path, max_iterations, json } => run_script(&path, max_iterations, json),
        Commands::Check { path } => check_script(&path),
        Commands::Repl => repl(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

fn run_script(path: &PathBuf, max_iterations: usize, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;
    let program = match Program::compile(&source) {
        Ok(program) => program,
        Err(err) => return Err(err.display_with_source(&source).into()),
    };

    let mut weave = Weave::new();
    let mut executor = program.stepper();
    let mut feedback_answer: Option<String> = None;

    while !executor.finished() {
        let result = executor.execute_next(&mut weave, feedback_answer.as_deref())?;
        feedback_answer = None;
        print_result(&result, json);

        if executor.awaiting_feedback() {
            feedback_answer = Some(prompt_stdin(&result.message)?);
        }
    }

    Ok(())
}

fn check_script(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;
    match Program::compile(&source) {
        Ok(program) => {
            println!("ok: {} instructions", program.instructions.len());
            Ok(())
        }
        Err(err) => Err(format!("{}", err.display_with_source(&source)).into()),
    }
}

fn repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut weave = Weave::new();
    let stdin = io::stdin();
    println!("weave repl — one statement per line, Ctrl-D to exit");

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match run_repl_line(&mut weave, &line) {
            Ok(result) => print_result(&result, false),
            Err(err) => eprintln!("{}", err),
        }
    }
    Ok(())
}

fn run_repl_line(weave: &mut Weave, line: &str) -> Result<crate::weave::CommandResult, WeaveError> {
    let program = Program::compile(line)?;
    let mut executor = program.stepper();
    executor.execute_next(weave, None)
}

fn print_result(result: &crate::weave::CommandResult, json: bool) {
    if json {
        println!("{}", serde_json::to_string(&result.to_view()).expect("CommandResultView always serializes"));
    } else if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
}

fn prompt_stdin(prompt: &str) -> io::Result<String> {
    print!("{} ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}
