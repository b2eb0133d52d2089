//! Integration tests for CLI command execution.
//!
//! Every test points `--config` and `--snapshot` into its own temp dir.

use clap::Parser;
use phylograph::cli::{Cli, execute};
use phylograph_core::{GraphStore, PhyloError, graph_from_snapshot, group_ids};
use std::path::{Path, PathBuf};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new(seed_demo: bool) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("phylograph.toml"),
            format!("seed_demo = {}\n", seed_demo),
        )
        .expect("config");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn snapshot(&self) -> PathBuf {
        self.path("store.ttl")
    }

    fn cli(&self, args: &[&str]) -> Cli {
        let config = self.path("phylograph.toml");
        let snapshot = self.snapshot();
        let mut argv = vec![
            "phylograph".to_string(),
            "--quiet".to_string(),
            "--json-mode".to_string(),
            "--config".to_string(),
            config.to_string_lossy().into_owned(),
            "--snapshot".to_string(),
            snapshot.to_string_lossy().into_owned(),
        ];
        argv.extend(args.iter().map(|a| (*a).to_string()));
        Cli::try_parse_from(argv).expect("arguments")
    }

    async fn run(&self, args: &[&str]) -> Result<(), PhyloError> {
        execute(self.cli(args)).await
    }
}

fn read_snapshot(path: &Path) -> phylograph_core::Graph {
    graph_from_snapshot(&std::fs::read_to_string(path).expect("read")).expect("parse")
}

#[tokio::test]
async fn first_run_persists_seeded_store() {
    let ws = Workspace::new(true);
    ws.run(&["status"]).await.expect("status");
    assert_eq!(
        read_snapshot(&ws.snapshot()).len(),
        phylograph_core::Ingestor::demo_batch().len()
    );
}

#[tokio::test]
async fn read_only_commands_do_not_rewrite_snapshot() {
    let ws = Workspace::new(true);
    let text = format!(
        "{}\n# untouched\n",
        phylograph_core::graph_to_snapshot(&phylograph_core::Graph::new())
    );
    std::fs::write(ws.snapshot(), &text).expect("snapshot");

    ws.run(&["status"]).await.expect("status");
    ws.run(&["groups"]).await.expect("groups");
    ws.run(&["tree"]).await.expect("tree");
    ws.run(&["query", "-q", "SELECT * { ?s ?p ?o }"])
        .await
        .expect("query");
    assert_eq!(std::fs::read_to_string(ws.snapshot()).expect("read"), text);
}

#[tokio::test]
async fn ingest_persists_across_invocations() {
    let ws = Workspace::new(false);
    let facts = ws.path("orthologs.json");
    std::fs::write(
        &facts,
        r#"[
            {"gene_id":"AT1G01010","species":"Arabidopsis thaliana","group_id":"G1"},
            {"gene_id":"Os01g0100100","species":"Oryza sativa","group_id":"G1"}
        ]"#,
    )
    .expect("facts");

    let file = facts.to_string_lossy().into_owned();
    ws.run(&["ingest", "--kind", "orthologs", "-f", &file])
        .await
        .expect("ingest");

    let graph = read_snapshot(&ws.snapshot());
    assert_eq!(graph.len(), 6);
    assert_eq!(group_ids(&graph), vec!["G1"]);

    let out = ws.path("tree.xml").to_string_lossy().into_owned();
    ws.run(&["export", "-t", "phyloxml", "-o", &out, "--group", "G1"])
        .await
        .expect("export");
    let xml = std::fs::read_to_string(ws.path("tree.xml")).expect("xml");
    assert!(xml.contains("<scientific_name>Oryza sativa</scientific_name>"));
}

#[tokio::test]
async fn clear_persists_empty_store() {
    let ws = Workspace::new(true);
    ws.run(&["clear"]).await.expect("clear");
    assert!(read_snapshot(&ws.snapshot()).is_empty());

    // An existing empty snapshot is not reseeded.
    ws.run(&["status"]).await.expect("status");
    assert!(read_snapshot(&ws.snapshot()).is_empty());
}

#[tokio::test]
async fn failed_load_leaves_snapshot_untouched() {
    let ws = Workspace::new(true);
    let doc = ws.path("bad.ttl");
    std::fs::write(&doc, "<http://x/a> <http://x/b> ( 1 2 ) .\n").expect("doc");

    let file = doc.to_string_lossy().into_owned();
    let result = ws.run(&["load", "-f", &file]).await;
    assert!(matches!(result, Err(PhyloError::ParseError { .. })));
    assert!(!ws.snapshot().exists());
}

#[tokio::test]
async fn federate_requires_an_endpoint() {
    let ws = Workspace::new(true);
    let result = ws.run(&["federate", "-q", "SELECT * {}"]).await;
    assert!(matches!(result, Err(PhyloError::ConfigError(_))));
}

#[test]
fn query_needs_text_or_file() {
    let ws = Workspace::new(true);
    assert!(Cli::try_parse_from(["phylograph", "query"]).is_err());
    assert!(
        Cli::try_parse_from(["phylograph", "query", "-q", "x", "-f", "y"]).is_err()
    );
    let cli = ws.cli(&["query", "-f", "q.rq"]);
    assert!(cli.snapshot.is_some());
}
