//! # Formats Module
//!
//! Serialization codecs for PhyloGraph graphs.
//!
//! - `turtle`: textual triple codec (bidirectional)
//! - `rdfxml`: RDF/XML codec (bidirectional)
//! - `phyloxml`: phylogenetic tree export (write-only)
//! - `persistence`: snapshot file format
//!
//! Every parser builds a scratch `Graph`; merging it into a store is a
//! separate, all-or-nothing step (`Store::merge_graph`).

pub mod persistence;
pub mod phyloxml;
pub mod rdfxml;
pub mod turtle;

pub use persistence::{SNAPSHOT_HEADER, graph_from_snapshot, graph_to_snapshot};
pub use phyloxml::PLACEHOLDER_PHYLOXML;

use crate::Iri;

/// Resolve an IRI reference against an optional base.
///
/// Absolute references are returned unchanged. Relative references are
/// resolved by fragment, absolute path or last path segment; dot segments
/// are not normalized. Without a base a relative reference stays relative,
/// and store validation rejects it.
pub(crate) fn resolve_iri(base: Option<&str>, reference: &str) -> Iri {
    let candidate = Iri::new(reference);
    let Some(base) = base else {
        return candidate;
    };
    if candidate.is_valid() {
        return candidate;
    }

    if reference.is_empty() {
        return Iri::new(base.split('#').next().unwrap_or(base));
    }
    if reference.starts_with('#') {
        let stem = base.split('#').next().unwrap_or(base);
        return Iri::new(format!("{}{}", stem, reference));
    }
    if let Some(path) = reference.strip_prefix('/') {
        // scheme://authority
        let authority_end = base
            .find("://")
            .and_then(|i| base[i + 3..].find('/').map(|j| i + 3 + j))
            .unwrap_or(base.len());
        return Iri::new(format!("{}/{}", &base[..authority_end], path));
    }

    let stem = base.split(['#', '?']).next().unwrap_or(base);
    let dir = stem.rfind('/').map_or(stem, |i| &stem[..=i]);
    Iri::new(format!("{}{}", dir, reference))
}

/// Split a full IRI into namespace and local name at the last `#` or `/`.
///
/// Returns `None` when the local part would be empty.
pub(crate) fn split_iri(iri: &str) -> Option<(&str, &str)> {
    let cut = iri.rfind(['#', '/'])? + 1;
    (cut < iri.len()).then(|| (&iri[..cut], &iri[cut..]))
}

/// 1-based line and column of a byte offset in `input`.
pub(crate) fn line_column(input: &str, offset: usize) -> (usize, usize) {
    let prefix = input.get(..offset.min(input.len())).unwrap_or(input);
    let line = prefix.matches('\n').count() + 1;
    let column = prefix
        .rsplit('\n')
        .next()
        .map_or(1, |tail| tail.chars().count() + 1);
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_references() {
        let base = Some("http://example.org/data/genes.rdf");
        assert_eq!(
            resolve_iri(base, "AT1G01010").as_str(),
            "http://example.org/data/AT1G01010"
        );
        assert_eq!(
            resolve_iri(base, "#g1").as_str(),
            "http://example.org/data/genes.rdf#g1"
        );
        assert_eq!(
            resolve_iri(base, "/other").as_str(),
            "http://example.org/other"
        );
        assert_eq!(
            resolve_iri(base, "").as_str(),
            "http://example.org/data/genes.rdf"
        );
        assert_eq!(resolve_iri(base, "urn:x").as_str(), "urn:x");
        assert_eq!(resolve_iri(None, "rel").as_str(), "rel");
    }

    #[test]
    fn split_at_last_separator() {
        assert_eq!(
            split_iri("http://example.org/ortholog/memberOf"),
            Some(("http://example.org/ortholog/", "memberOf"))
        );
        assert_eq!(
            split_iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
            Some(("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "type"))
        );
        assert_eq!(split_iri("http://example.org/"), None);
    }

    #[test]
    fn line_column_of_offset() {
        assert_eq!(line_column("abc", 0), (1, 1));
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
    }
}
