//! ljsync CLI
//!
//! Command-line client for exporting a LiveJournal-protocol journal.
//!
//! # Commands
//!
//! - `sync` - Pull every post and comment and write canonical records
//! - `version` - Show version information

mod client;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// LiveJournal export command-line client.
#[derive(Parser)]
#[command(name = "ljsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull every post and comment and write canonical records
    Sync {
        /// Account username
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Journal host to sync from
        #[arg(short, long, default_value = "livejournal.com")]
        server: String,

        /// Output file for JSON-lines records (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum transient failures tolerated per remote operation
        #[arg(long, default_value = "5")]
        max_failures: u32,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Sync {
            username,
            password,
            server,
            output,
            max_failures,
        } => {
            commands::sync::run(&username, &password, &server, output.as_deref(), max_failures)?;
        }
        Commands::Version => {
            println!("ljsync {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
