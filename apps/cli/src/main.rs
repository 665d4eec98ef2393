//! Ferrum command-line interface

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// FHIR model tooling
#[derive(Parser)]
#[command(name = "ferrum")]
#[command(author, version, about = "FHIR model generation, canonicalization and validation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate Rust models and property tables from StructureDefinitions
    Generate {
        /// StructureDefinition, Bundle or directory of JSON files
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
        /// Only write tables.json
        #[arg(long)]
        tables_only: bool,
    },
    /// Print a resource with its keys in canonical order
    Canonicalize {
        /// Resource JSON file
        file: PathBuf,
        /// Extra property tables (JSON, as written by `generate`)
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a resource, or a JSON array of resources
    Validate {
        /// Resource JSON file
        file: PathBuf,
        /// Validator configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Extra property tables (JSON, as written by `generate`)
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Generate {
            input,
            out,
            tables_only,
        } => commands::generate(&input, &out, tables_only),
        Commands::Canonicalize {
            file,
            schema,
            pretty,
        } => commands::canonicalize(&file, schema.as_deref(), pretty),
        Commands::Validate {
            file,
            config,
            schema,
        } => commands::validate(&file, config.as_deref(), schema.as_deref()).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
