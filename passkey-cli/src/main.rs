//! passkey-inspect - Inspect captured passkey credential submissions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::{ExitCode, USAGE_ERROR};

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error
  65  Data error (not a credential submission, undecodable field)
  66  Input file missing or unreadable";

#[derive(Parser)]
#[command(name = "passkey-inspect")]
#[command(author, version, about = "Inspect captured passkey credential submissions", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a store_credential or authenticate_credential payload
    Decode {
        /// Path to the JSON payload, or - for stdin
        #[arg(value_name = "FILE", default_value = "-")]
        input: PathBuf,

        /// Print the credential as webauthn-rs expects it instead of a summary
        #[arg(long)]
        webauthn: bool,
    },

    /// Print the transport (base64) encoding of a binary file
    Encode {
        /// Path to the binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(USAGE_ERROR);
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(exit_codes::SUCCESS);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Decode { input, webauthn } => commands::decode::execute(input, webauthn),
        Commands::Encode { file } => commands::encode::execute(file),
    };

    let exit = match result {
        Ok(()) => ExitCode::success(),
        Err(e) => ExitCode::from_anyhow(&e),
    };
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
