//! Doraemon — CI blast-radius analysis for JavaScript/TypeScript repos.
//!
//! Entry point: parse arguments, initialize logging, dispatch to the
//! requested service.

use clap::Parser;
use dora_cli::{cli, commands, error, logger};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);

    let result = match args.command {
        cli::Command::Worker => commands::worker::execute().await,
        cli::Command::Ingest => commands::ingest::execute().await,
        cli::Command::Graphd => commands::graphd::execute().await,
        cli::Command::Check => commands::check::execute().await,
    };

    result.map_err(error::cli_error_to_miette)
}
