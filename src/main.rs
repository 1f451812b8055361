use std::io::{stderr, stdout, IsTerminal};
use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use ripple_rs::{cli, Config};

fn run() -> Result<()> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    let args: Vec<String> = std::env::args().skip(1).collect();
    cli::run(&args, &config, &mut stdout().lock())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("RIPPLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(stderr)
        .with_ansi(stderr().is_terminal())
        .without_time()
        .with_target(false)
        .try_init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
