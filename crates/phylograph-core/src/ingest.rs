//! # Ingest Module
//!
//! Mapping from typed fact records to triples for PhyloGraph CORE.
//!
//! - Every identifier is classified exactly once, here
//! - Reject malformed input before the store is touched
//! - No semantic inference or enrichment

use crate::primitives::{
    DEMO_GROUP, EX, EX_ASSOCIATED_WITH, EX_GENE, EX_GERMPLASM, EX_LABEL, EX_SPECIES,
    ORTH_LABEL, ORTH_MEMBER_OF, ORTH_SPECIES, RDF_TYPE,
};
use crate::store::Store;
use crate::{Iri, Literal, PhyloError, Term, Triple};
use serde::{Deserialize, Serialize};

// =============================================================================
// FACT RECORDS
// =============================================================================

/// A gene-to-trait association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitLink {
    pub gene_id: String,
    pub gene_label: String,
    pub trait_label: String,
    pub trait_uri: String,
    pub species: String,
}

/// A germplasm-to-trait association, as delivered by BrAPI-shaped payloads.
///
/// The record shape is the same as `TraitLink`; only the class differs.
pub type GermplasmLink = TraitLink;

/// Membership of a gene in an ortholog group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrthologLink {
    pub gene_id: String,
    pub species: String,
    pub group_id: String,
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classify an identifier as an IRI.
///
/// An identifier with an `http` or `https` scheme is used as-is; anything
/// else is placed under the default `ex:` namespace.
#[must_use]
pub fn classify_identifier(id: &str) -> Iri {
    let lower = id.get(..8).unwrap_or(id).to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Iri::new(id)
    } else {
        Iri::new(format!("{}{}", EX, id))
    }
}

// =============================================================================
// INGESTOR
// =============================================================================

/// The Ingestor turns fact records into validated triple batches.
///
/// The Ingestor:
/// - Applies the classification rule to every identifier
/// - Treats `trait_uri` as an asserted reference that must be absolute
/// - Returns batches that `Store::insert_batch` accepts unchanged
pub struct Ingestor;

impl Ingestor {
    /// Map trait associations to `ex:Gene` facts, four triples per record.
    pub fn trait_triples(records: &[TraitLink]) -> Result<Vec<Triple>, PhyloError> {
        Self::link_triples(records, EX_GENE)
    }

    /// Map germplasm associations to `ex:Germplasm` facts.
    pub fn germplasm_triples(records: &[GermplasmLink]) -> Result<Vec<Triple>, PhyloError> {
        Self::link_triples(records, EX_GERMPLASM)
    }

    /// Map ortholog memberships to `orth:` facts, three triples per record.
    pub fn ortholog_triples(records: &[OrthologLink]) -> Result<Vec<Triple>, PhyloError> {
        let mut triples = Vec::with_capacity(records.len() * 3);

        for record in records {
            Self::require_identifier(&record.gene_id, triples.len())?;
            Self::require_identifier(&record.group_id, triples.len())?;

            let gene = classify_identifier(&record.gene_id);
            triples.push(Triple::new(
                gene.clone(),
                Iri::new(ORTH_MEMBER_OF),
                Literal::plain(&record.group_id),
            ));
            triples.push(Triple::new(
                gene.clone(),
                Iri::new(ORTH_SPECIES),
                Literal::plain(&record.species),
            ));
            triples.push(Triple::new(
                gene,
                Iri::new(ORTH_LABEL),
                Literal::plain(&record.gene_id),
            ));
        }

        Store::validate_batch(&triples)?;
        Ok(triples)
    }

    fn link_triples(records: &[TraitLink], class: &str) -> Result<Vec<Triple>, PhyloError> {
        let mut triples = Vec::with_capacity(records.len() * 4);

        for record in records {
            Self::require_identifier(&record.gene_id, triples.len())?;

            let subject = classify_identifier(&record.gene_id);
            // trait_uri is never classified: a relative value stays relative
            // and fails validation below.
            let target = Iri::new(record.trait_uri.trim());

            triples.push(Triple::new(
                subject.clone(),
                Iri::new(RDF_TYPE),
                Term::Iri(Iri::new(class)),
            ));
            triples.push(Triple::new(
                subject.clone(),
                Iri::new(EX_ASSOCIATED_WITH),
                target,
            ));
            triples.push(Triple::new(
                subject.clone(),
                Iri::new(EX_SPECIES),
                Literal::plain(&record.species),
            ));
            triples.push(Triple::new(
                subject,
                Iri::new(EX_LABEL),
                Literal::plain(&record.gene_label),
            ));
        }

        Store::validate_batch(&triples)?;
        Ok(triples)
    }

    fn require_identifier(id: &str, index: usize) -> Result<(), PhyloError> {
        if id.trim().is_empty() {
            return Err(PhyloError::MalformedTriple {
                index,
                reason: "empty identifier".to_string(),
            });
        }
        Ok(())
    }

    /// The demo seed loaded into a fresh store.
    ///
    /// One trait fact for `AT1G01010` plus its membership in the demo group.
    #[must_use]
    pub fn demo_batch() -> Vec<Triple> {
        let gene = classify_identifier("AT1G01010");
        vec![
            Triple::new(gene.clone(), Iri::new(RDF_TYPE), Term::iri(EX_GENE)),
            Triple::new(
                gene.clone(),
                Iri::new(EX_ASSOCIATED_WITH),
                Term::iri("http://purl.obolibrary.org/obo/TO_0006001"),
            ),
            Triple::new(
                gene.clone(),
                Iri::new(EX_SPECIES),
                Literal::plain("Arabidopsis thaliana"),
            ),
            Triple::new(gene.clone(), Iri::new(EX_LABEL), Literal::plain("Gene1")),
            Triple::new(gene, Iri::new(ORTH_MEMBER_OF), Literal::plain(DEMO_GROUP)),
        ]
    }
}

// =============================================================================
// TESTS
// =============================================================================
