//! Quarry CLI - compile query chains offline.
//!
//! Reads an operator chain and a set of class maps as JSON and prints what
//! the compiler makes of them: the structural query model, or the rendered
//! filter, sort, paging, and hint documents.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Query chain compiler.
///
/// A command-line interface for inspecting how operator chains translate
/// into document-database queries.
#[derive(Parser)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress progress and info messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format (default for TTY)
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Compile a chain into filter, sort, paging, and hint documents
    Compile {
        /// Path to the operator chain (JSON)
        query: PathBuf,

        /// Path to the class maps (JSON array)
        #[arg(long)]
        classes: PathBuf,

        /// Discriminator element name
        #[arg(long, default_value = "_t")]
        discriminator: String,
    },

    /// Show the query model of a chain without resolving any field
    Model {
        /// Path to the operator chain (JSON)
        query: PathBuf,
    },

    /// List registered classes with their members and discriminators
    Classes {
        /// Path to the class maps (JSON array)
        classes: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Compile {
            query,
            classes,
            discriminator,
        } => commands::compile::run(&query, &classes, &discriminator, cli.format, cli.quiet),
        Commands::Model { query } => commands::model::run(&query, cli.format, cli.quiet),
        Commands::Classes { classes } => commands::classes::run(&classes, cli.format, cli.quiet),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
