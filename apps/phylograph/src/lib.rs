//! # phylograph
//!
//! The PhyloGraph application layer - THE BINARY.
//!
//! - `cli`: clap commands over one `AppContext`
//! - `config`: `phylograph.toml` with environment overrides
//! - `context`: owns the `Store` and its snapshot file
//! - `federation`: forwards queries to remote SPARQL endpoints
//!
//! This is the only crate that performs I/O. All store, query and codec
//! logic lives in `phylograph-core`.

pub mod cli;
pub mod config;
pub mod context;
pub mod federation;
