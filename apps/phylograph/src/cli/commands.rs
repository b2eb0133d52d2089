//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Each store command returns whether it changed the store, so the caller
//! knows to write the snapshot.

use super::{ExportFormat, FactKind, InputFormat};
use crate::config::Config;
use crate::context::AppContext;
use crate::federation::FederationClient;
use phylograph_core::formats::{phyloxml, rdfxml, turtle};
use phylograph_core::{
    GermplasmLink, GraphStore, Ingestor, OrthologLink, PhyloError, TraitLink, TreeNode, evaluate,
    export_tree, group_ids, parse_query,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for ingestion (100 MB).
const MAX_INGEST_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum file size for `load` documents (256 MB).
const MAX_LOAD_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Maximum query file size (1 MB).
const MAX_QUERY_FILE_SIZE: u64 = 1024 * 1024;

/// Resolve an input path and check that it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, PhyloError> {
    let canonical = path.canonicalize().map_err(|e| {
        PhyloError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(PhyloError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read an input file after checking its path and size.
fn read_input(path: &Path, max_size: u64) -> Result<Vec<u8>, PhyloError> {
    let validated = validate_file_path(path)?;

    let metadata = std::fs::metadata(&validated)
        .map_err(|e| PhyloError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size {
        return Err(PhyloError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }

    std::fs::read(&validated).map_err(|e| PhyloError::IoError(format!("Read file: {}", e)))
}

fn read_text(path: &Path, max_size: u64) -> Result<String, PhyloError> {
    String::from_utf8(read_input(path, max_size)?)
        .map_err(|_| PhyloError::IoError(format!("'{}' is not valid UTF-8", path.display())))
}

/// Resolve an output path against a canonical, existing parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, PhyloError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        PhyloError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(PhyloError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| PhyloError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Query text from `--query` or `--file`.
pub fn read_query(query: Option<String>, file: Option<&Path>) -> Result<String, PhyloError> {
    match (query, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => read_text(path, MAX_QUERY_FILE_SIZE),
        (None, None) => Err(PhyloError::QuerySyntax(
            "no query given; use --query or --file".to_string(),
        )),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), PhyloError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| PhyloError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub fn cmd_status(ctx: &AppContext, json_mode: bool) -> Result<bool, PhyloError> {
    let snapshot = ctx.store().snapshot();
    let groups = group_ids(&*snapshot);

    if json_mode {
        print_json(&serde_json::json!({
            "snapshot": ctx.snapshot_path().to_string_lossy(),
            "triples": snapshot.len(),
            "subjects": snapshot.subjects().count(),
            "groups": groups.len(),
            "prefixes": snapshot.prefixes(),
        }))?;
        return Ok(false);
    }

    println!("PhyloGraph Store Status");
    println!("=======================");
    println!("Snapshot: {}", ctx.snapshot_path().display());
    println!();
    println!("Triples:  {}", snapshot.len());
    println!("Subjects: {}", snapshot.subjects().count());
    println!("Groups:   {}", groups.len());
    println!("Prefixes: {}", snapshot.prefixes().len());

    Ok(false)
}

// =============================================================================
// INGEST COMMAND
// =============================================================================

fn parse_records<T: DeserializeOwned>(contents: &[u8]) -> Result<Vec<T>, PhyloError> {
    serde_json::from_slice(contents)
        .map_err(|e| PhyloError::SerializationError(format!("Invalid fact file: {}", e)))
}

/// Ingest fact records from a JSON array.
pub fn cmd_ingest(
    ctx: &AppContext,
    json_mode: bool,
    kind: FactKind,
    file: &Path,
) -> Result<bool, PhyloError> {
    tracing::info!("Ingesting {:?} facts from {}", kind, file.display());

    let contents = read_input(file, MAX_INGEST_FILE_SIZE)?;
    let (records, batch) = match kind {
        FactKind::Traits => {
            let records: Vec<TraitLink> = parse_records(&contents)?;
            (records.len(), Ingestor::trait_triples(&records)?)
        }
        FactKind::Germplasm => {
            let records: Vec<GermplasmLink> = parse_records(&contents)?;
            (records.len(), Ingestor::germplasm_triples(&records)?)
        }
        FactKind::Orthologs => {
            let records: Vec<OrthologLink> = parse_records(&contents)?;
            (records.len(), Ingestor::ortholog_triples(&records)?)
        }
    };

    let added = ctx.store().insert_batch(batch)?;

    if json_mode {
        print_json(&serde_json::json!({
            "records": records,
            "added": added,
            "triples": ctx.store().len(),
        }))?;
    } else {
        println!("Ingested {} records ({} new triples)", records, added);
        println!("Store now has {} triples", ctx.store().len());
    }

    Ok(added > 0)
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// Load a turtle or RDF/XML document into the store.
pub fn cmd_load(
    ctx: &AppContext,
    json_mode: bool,
    file: &Path,
    format: InputFormat,
) -> Result<bool, PhyloError> {
    tracing::info!("Loading {} as {:?}", file.display(), format);

    let text = read_text(file, MAX_LOAD_FILE_SIZE)?;
    let scratch = match format {
        InputFormat::Turtle => turtle::parse(&text)?,
        InputFormat::Rdfxml => rdfxml::parse(&text)?,
    };
    let parsed = scratch.len();
    let added = ctx.store().merge_graph(scratch)?;

    if json_mode {
        print_json(&serde_json::json!({
            "parsed": parsed,
            "added": added,
            "triples": ctx.store().len(),
        }))?;
    } else {
        println!("Loaded {} triples ({} new)", parsed, added);
        println!("Store now has {} triples", ctx.store().len());
    }

    // Prefix bindings may change even when no triple is new.
    Ok(true)
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the store or the ortholog tree to a file.
pub fn cmd_export(
    ctx: &AppContext,
    output: &Path,
    format: ExportFormat,
    group: Option<&str>,
) -> Result<bool, PhyloError> {
    let validated_output = validate_output_path(output)?;
    let snapshot = ctx.store().snapshot();

    if group.is_some() && matches!(format, ExportFormat::Turtle | ExportFormat::Rdfxml) {
        tracing::warn!("--group only applies to phyloxml and tree exports; ignoring it");
    }

    let data = match format {
        ExportFormat::Turtle => turtle::serialize(&snapshot),
        ExportFormat::Rdfxml => rdfxml::serialize(&snapshot)?,
        ExportFormat::Phyloxml => phyloxml::export(&*snapshot, group)?,
        ExportFormat::Tree => serde_json::to_string_pretty(&export_tree(&*snapshot, group)?)
            .map_err(|e| PhyloError::SerializationError(e.to_string()))?,
    };

    std::fs::write(&validated_output, data.as_bytes())
        .map_err(|e| PhyloError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} bytes to {}",
        data.len(),
        validated_output.display()
    );

    Ok(false)
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

/// Evaluate a SELECT query against the store.
pub fn cmd_query(ctx: &AppContext, json_mode: bool, text: &str) -> Result<bool, PhyloError> {
    let query = parse_query(text)?;
    let solutions = evaluate(&*ctx.store().snapshot(), &query)?;

    if json_mode {
        println!("{}", solutions.to_json().to_json_string()?);
        return Ok(false);
    }

    println!("{}", solutions.variables().join("\t"));
    for row in solutions.rows() {
        let cells: Vec<&str> = solutions
            .variables()
            .iter()
            .map(|var| row.get(var).map_or("", |term| term.lexical()))
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!("({} rows)", solutions.len());

    Ok(false)
}

// =============================================================================
// GROUP AND TREE COMMANDS
// =============================================================================

/// List ortholog group ids.
pub fn cmd_groups(ctx: &AppContext, json_mode: bool) -> Result<bool, PhyloError> {
    let groups = group_ids(&*ctx.store().snapshot());

    if json_mode {
        print_json(&groups)?;
    } else {
        for group in &groups {
            println!("{}", group);
        }
    }

    Ok(false)
}

/// Print the ortholog tree.
pub fn cmd_tree(ctx: &AppContext, json_mode: bool, group: Option<&str>) -> Result<bool, PhyloError> {
    let tree = export_tree(&*ctx.store().snapshot(), group)?;

    if json_mode {
        print_json(&tree)?;
    } else {
        print!("{}", render_tree(&tree));
    }

    Ok(false)
}

/// Indented text rendering, one node per line.
pub fn render_tree(tree: &TreeNode) -> String {
    fn walk(node: &TreeNode, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&node.name);
        if let Some(species) = &node.species {
            out.push_str(&format!(" ({})", species));
        }
        out.push('\n');
        for child in &node.children {
            walk(child, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(tree, 0, &mut out);
    out
}

// =============================================================================
// FEDERATE COMMAND
// =============================================================================

/// Forward a query to a remote endpoint and print the response.
pub async fn cmd_federate(
    config: &Config,
    endpoint: Option<&str>,
    text: &str,
    raw: bool,
    json_mode: bool,
) -> Result<(), PhyloError> {
    let endpoint = endpoint
        .or(config.federation.default_endpoint.as_deref())
        .ok_or_else(|| {
            PhyloError::ConfigError(
                "no endpoint given and federation.default_endpoint is not set".to_string(),
            )
        })?;

    let client = FederationClient::new(config.federation.timeout())?;
    let response = client.dispatch(endpoint, text).await?;

    if raw || !response.is_results_json() {
        print!("{}", response.text());
        return Ok(());
    }

    let results = response.into_solutions()?;
    if json_mode {
        println!("{}", results.to_json_string()?);
    } else {
        println!("{}", results.head.vars.join("\t"));
        for binding in &results.results.bindings {
            let cells: Vec<&str> = results
                .head
                .vars
                .iter()
                .map(|var| binding.get(var).map_or("", |term| term.value.as_str()))
                .collect();
            println!("{}", cells.join("\t"));
        }
    }

    Ok(())
}

// =============================================================================
// CLEAR COMMAND
// =============================================================================

/// Remove every triple, keeping prefix bindings.
pub fn cmd_clear(ctx: &AppContext) -> Result<bool, PhyloError> {
    let removed = ctx.store().len();
    ctx.store().clear();
    println!("Cleared {} triples", removed);
    Ok(true)
}
