//! # ahab — module-based deployment manifest generator
//!
//! Resolves module dependencies and writes a hardened docker-compose
//! manifest. Exit codes: 1 for module errors, 2 for dependency cycles,
//! 3 when the manifest cannot be written.

mod commands;
mod output;

use std::process::ExitCode;

use ahab_common::error::{AhabError, EXIT_MODULE};
use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use crate::commands::{Cli, LogFormat};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_exit_code(&err));
        }
    };
    init_tracing(cli.log_format);

    match commands::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Help and version output succeed; every other parse failure is a bad
/// request, never mistaken for a dependency cycle.
fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_MODULE,
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<AhabError>()
        .map_or(EXIT_MODULE, AhabError::exit_code)
}
