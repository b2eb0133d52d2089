//! # Snapshot Format
//!
//! Text snapshot of a graph: a header comment line followed by the turtle
//! serialization. File I/O lives in the app layer.
//!
//! The size limit is checked before parsing, and the header before the
//! payload.

use crate::formats::turtle;
use crate::primitives::MAX_SNAPSHOT_SIZE;
use crate::{Graph, PhyloError};

/// First line of every snapshot.
pub const SNAPSHOT_HEADER: &str = "# phylograph snapshot";

/// Serialize a graph into snapshot text.
#[must_use]
pub fn graph_to_snapshot(graph: &Graph) -> String {
    format!("{}\n{}", SNAPSHOT_HEADER, turtle::serialize(graph))
}

/// Parse snapshot text into a scratch graph.
pub fn graph_from_snapshot(text: &str) -> Result<Graph, PhyloError> {
    if text.len() > MAX_SNAPSHOT_SIZE {
        return Err(PhyloError::SerializationError(format!(
            "snapshot is {} bytes, maximum is {}",
            text.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let first_line = text.lines().next().unwrap_or_default();
    if first_line.trim_end() != SNAPSHOT_HEADER {
        return Err(PhyloError::SerializationError(
            "missing snapshot header".to_string(),
        ));
    }

    turtle::parse(text)
}
