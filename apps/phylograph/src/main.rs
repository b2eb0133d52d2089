//! # PhyloGraph
//!
//! The main binary for the PhyloGraph gene, trait and ortholog store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/phylograph (THE BINARY)             │
//! │                                                          │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────┐  │
//! │  │   CLI       │    │  Snapshot   │    │  Federation  │  │
//! │  │  (clap)     │    │  (context)  │    │  (reqwest)   │  │
//! │  └──────┬──────┘    └──────┬──────┘    └──────────────┘  │
//! │         │                  │                             │
//! │         └────────┬─────────┘                             │
//! │                  ▼                                       │
//! │        ┌──────────────────┐                              │
//! │        │ phylograph-core  │                              │
//! │        │   (THE LOGIC)    │                              │
//! │        └──────────────────┘                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! phylograph status
//! phylograph ingest --kind orthologs -f orthologs.json
//! phylograph query -q 'SELECT ?g { ?g <http://example.org/ortholog/memberOf> "G1" }'
//! phylograph export -t phyloxml -o tree.xml --group G1
//! phylograph federate -u https://sparql.example.org/query -f query.rq
//! ```

use clap::Parser;
use phylograph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // PHYLOGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("PHYLOGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_env("PHYLOGRAPH_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "phylograph=info".into());

    // Logs go to stderr; stdout carries command output.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the PhyloGraph startup banner to stderr.
fn print_banner() {
    eprintln!(
        "PhyloGraph v{} - genes, traits and orthologs as triples",
        env!("CARGO_PKG_VERSION")
    );
}
