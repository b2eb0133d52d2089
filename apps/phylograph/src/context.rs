//! # Application Context
//!
//! Owns the process's single `Store` and its snapshot file.
//!
//! The snapshot is read once on startup and written on shutdown. Between
//! the two the store lives only in memory.

use crate::config::Config;
use phylograph_core::primitives::MAX_SNAPSHOT_SIZE;
use phylograph_core::{
    GraphStore, Ingestor, PhyloError, Store, graph_from_snapshot, graph_to_snapshot,
};
use std::path::{Path, PathBuf};

/// The store plus where it is persisted.
pub struct AppContext {
    store: Store,
    snapshot_path: PathBuf,
}

impl AppContext {
    /// Load the snapshot if one exists, otherwise start empty (or seeded).
    pub fn startup(config: &Config) -> Result<Self, PhyloError> {
        let path = &config.snapshot_path;

        let store = if path.exists() {
            let graph = graph_from_snapshot(&read_snapshot(path)?)?;
            tracing::info!(
                "Loaded {} triples from snapshot {}",
                graph.len(),
                path.display()
            );
            Store::with_graph(graph)
        } else {
            let store = Store::new();
            if config.seed_demo {
                let added = store.insert_batch(Ingestor::demo_batch())?;
                tracing::info!("No snapshot at {}, seeded {} demo triples", path.display(), added);
            } else {
                tracing::info!("No snapshot at {}, starting empty", path.display());
            }
            store
        };

        Ok(Self {
            store,
            snapshot_path: path.clone(),
        })
    }

    /// Wrap an existing store, for tests and embedding.
    pub fn with_store(store: Store, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            snapshot_path: snapshot_path.into(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Write the snapshot: temp file in the same directory, then rename.
    ///
    /// Concurrent processes race; the last rename wins.
    pub fn shutdown(&self) -> Result<(), PhyloError> {
        let text = graph_to_snapshot(&self.store.snapshot());

        let mut temp = self.snapshot_path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        std::fs::write(&temp, text.as_bytes()).map_err(|e| {
            PhyloError::IoError(format!("cannot write {}: {}", temp.display(), e))
        })?;
        std::fs::rename(&temp, &self.snapshot_path).map_err(|e| {
            PhyloError::IoError(format!(
                "cannot replace {}: {}",
                self.snapshot_path.display(),
                e
            ))
        })?;

        tracing::info!(
            "Saved {} triples to snapshot {}",
            self.store.len(),
            self.snapshot_path.display()
        );
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<String, PhyloError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| PhyloError::IoError(format!("cannot stat {}: {}", path.display(), e)))?;
    if metadata.len() > MAX_SNAPSHOT_SIZE as u64 {
        return Err(PhyloError::SerializationError(format!(
            "snapshot {} is {} bytes, maximum is {}",
            path.display(),
            metadata.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }
    std::fs::read_to_string(path)
        .map_err(|e| PhyloError::IoError(format!("cannot read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use phylograph_core::{OrthologLink, group_ids};

    fn config_in(dir: &Path, seed_demo: bool) -> Config {
        Config {
            snapshot_path: dir.join("store.ttl"),
            seed_demo,
            ..Config::default()
        }
    }

    #[test]
    fn fresh_start_seeds_demo() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = AppContext::startup(&config_in(dir.path(), true)).expect("startup");
        assert_eq!(ctx.store().len(), Ingestor::demo_batch().len());

        let ctx = AppContext::startup(&config_in(dir.path(), false)).expect("startup");
        assert!(ctx.store().is_empty());
    }

    #[test]
    fn shutdown_then_startup_restores_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_in(dir.path(), false);

        let ctx = AppContext::startup(&config).expect("startup");
        let links = [OrthologLink {
            gene_id: "Os01g0100100".to_string(),
            species: "Oryza sativa".to_string(),
            group_id: "G1".to_string(),
        }];
        ctx.store()
            .insert_batch(Ingestor::ortholog_triples(&links).expect("map"))
            .expect("insert");
        ctx.shutdown().expect("shutdown");
        assert!(!dir.path().join("store.ttl.tmp").exists());

        let restored = AppContext::startup(&config).expect("restart");
        assert_eq!(restored.store().len(), 3);
        assert_eq!(group_ids(&*restored.store().snapshot()), vec!["G1"]);
    }

    #[test]
    fn existing_snapshot_is_not_reseeded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = AppContext::with_store(Store::new(), dir.path().join("store.ttl"));
        ctx.shutdown().expect("shutdown");

        let ctx = AppContext::startup(&config_in(dir.path(), true)).expect("startup");
        assert!(ctx.store().is_empty());
    }

    #[test]
    fn corrupt_snapshot_fails_startup() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("store.ttl"), "not a snapshot").expect("write");
        assert!(matches!(
            AppContext::startup(&config_in(dir.path(), true)),
            Err(PhyloError::SerializationError(_))
        ));
    }
}
