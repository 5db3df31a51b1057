//! Command-line interface for quilld.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Quilld - Personal Blog Server
/// The backend for a single-author blog
#[derive(Parser)]
#[command(name = "quilld")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file (defaults to the standard lookup chain)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (the default when no command is given)
    Serve,

    /// Create a config file with a freshly generated token secret
    #[command(alias = "--init")]
    Init,
}
