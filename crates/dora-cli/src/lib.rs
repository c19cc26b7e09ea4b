//! Doraemon CLI internals: argument parsing, logging setup, and the
//! subcommand implementations wired together from the service crates.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
