//! `weave` binary entry point. A thin wrapper around `weave::cli::run_cli`;
//! all command logic lives in the library crate for testability.

fn main() {
    if let Err(err) = weave::cli::run_cli() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
