//! CLI entry point.
//!
//! Usage: `proxy <port>`: exactly one argument, a numeric port, no
//! config file, no environment variables. Argument parsing is
//! hand-rolled rather than `clap`-based to keep that contract exact:
//! wrong argument count exits 1 with a usage line on stderr.

use std::process::ExitCode;

use cache_proxy::config::Limits;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <port>", args.first().map(String::as_str).unwrap_or("proxy"));
        return ExitCode::FAILURE;
    }

    let port: u16 = match args[1].parse() {
        Ok(p) => p,
        Err(_) => {
            eprintln!("usage: {} <port>", args[0]);
            return ExitCode::FAILURE;
        }
    };

    init_logging("info");

    if let Err(e) = cache_proxy::run(port, Limits::default()) {
        tracing::error!(error = %e, "proxy exited with an error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}
