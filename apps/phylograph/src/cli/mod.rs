//! # PhyloGraph CLI Module
//!
//! This module implements the CLI interface for PhyloGraph.
//!
//! ## Available Commands
//!
//! - `status` - Show store status
//! - `ingest` - Ingest trait, germplasm or ortholog facts from JSON
//! - `load` - Load a turtle or RDF/XML document
//! - `export` - Export the store or the ortholog tree to a file
//! - `query` - Evaluate a SELECT query
//! - `groups` - List ortholog groups
//! - `tree` - Print the ortholog tree
//! - `federate` - Forward a query to a remote endpoint
//! - `clear` - Remove every triple

mod commands;

use crate::config::Config;
use crate::context::AppContext;
use clap::{Parser, Subcommand, ValueEnum};
use phylograph_core::PhyloError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// PhyloGraph - gene, trait and ortholog knowledge store
///
/// Records facts as triples, answers pattern queries and exports ortholog
/// trees.
#[derive(Parser, Debug)]
#[command(name = "phylograph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to phylograph.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Snapshot file (overrides config and environment)
    #[arg(short = 'S', long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Suppress banner output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Kind of fact records in an ingest file.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FactKind {
    Traits,
    Germplasm,
    Orthologs,
}

/// Document formats accepted by `load`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Turtle,
    Rdfxml,
}

/// Output formats of `export`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Turtle,
    Rdfxml,
    Phyloxml,
    Tree,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show store status
    Status,

    /// Ingest fact records from a JSON array
    Ingest {
        /// Record kind
        #[arg(short, long, value_enum)]
        kind: FactKind,

        /// Path to the JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Load a turtle or RDF/XML document into the store
    Load {
        /// Path to the document
        #[arg(short, long)]
        file: PathBuf,

        /// Document format
        #[arg(short = 't', long, value_enum, default_value = "turtle")]
        format: InputFormat,
    },

    /// Export the store or the ortholog tree
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format
        #[arg(short = 't', long, value_enum, default_value = "turtle")]
        format: ExportFormat,

        /// Restrict phyloxml/tree output to one ortholog group
        #[arg(short, long)]
        group: Option<String>,
    },

    /// Evaluate a SELECT query against the store
    Query {
        /// Query text
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        query: Option<String>,

        /// File containing the query
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List ortholog group ids
    Groups,

    /// Print the ortholog tree
    Tree {
        /// Restrict to one ortholog group
        #[arg(short, long)]
        group: Option<String>,
    },

    /// Forward a query to a remote SPARQL endpoint
    Federate {
        /// Endpoint URL (defaults to federation.default_endpoint)
        #[arg(short = 'u', long)]
        endpoint: Option<String>,

        /// Query text
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        query: Option<String>,

        /// File containing the query
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the response body as received
        #[arg(long)]
        raw: bool,
    },

    /// Remove every triple (prefix bindings are kept)
    Clear,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
///
/// Commands that change the store write the snapshot before returning.
pub async fn execute(cli: Cli) -> Result<(), PhyloError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.snapshot {
        config.snapshot_path = path;
    }
    let json_mode = cli.json_mode;

    let command = cli.command.unwrap_or(Commands::Status);

    // Federation never touches the local store.
    if let Commands::Federate {
        endpoint,
        query,
        file,
        raw,
    } = command
    {
        let text = read_query(query, file.as_deref())?;
        return cmd_federate(&config, endpoint.as_deref(), &text, raw, json_mode).await;
    }

    let ctx = AppContext::startup(&config)?;

    let changed = match command {
        Commands::Status => cmd_status(&ctx, json_mode)?,
        Commands::Ingest { kind, file } => cmd_ingest(&ctx, json_mode, kind, &file)?,
        Commands::Load { file, format } => cmd_load(&ctx, json_mode, &file, format)?,
        Commands::Export {
            output,
            format,
            group,
        } => cmd_export(&ctx, &output, format, group.as_deref())?,
        Commands::Query { query, file } => {
            let text = read_query(query, file.as_deref())?;
            cmd_query(&ctx, json_mode, &text)?
        }
        Commands::Groups => cmd_groups(&ctx, json_mode)?,
        Commands::Tree { group } => cmd_tree(&ctx, json_mode, group.as_deref())?,
        Commands::Clear => cmd_clear(&ctx)?,
        Commands::Federate { .. } => false,
    };

    // A first run also persists whatever startup seeded.
    if changed || !ctx.snapshot_path().exists() {
        ctx.shutdown()?;
    }
    Ok(())
}
