//! # canopy-core — Foundational Types for the Canopy Blueprint Compiler
//!
//! This crate is the bedrock of the Canopy stack. It defines the types shared
//! by every stage of blueprint compilation: the raw document value model, the
//! dotted element paths that anchor every diagnostic, the DSL version tuple
//! used for feature gating, and the structured parsing-error hierarchy.
//!
//! ## Key Design Principles
//!
//! 1. **One value model.** Raw blueprint content is `serde_json::Value` with
//!    insertion-ordered mappings (the `preserve_order` feature). YAML input
//!    is converted through [`value::from_yaml_value`] at the boundary; the
//!    compiler core never touches YAML directly.
//!
//! 2. **Errors carry location.** Every parsing error embeds enough context
//!    (dotted element path, offending name list) to be actionable without
//!    re-parsing the document, and exposes a stable numeric code for
//!    programmatic handling.
//!
//! 3. **Format vs logic split.** Malformed document shape is always locally
//!    detectable and never recovered; semantic failures (unknown types,
//!    cycles, ambiguous mappings) fail fast with their own codes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `canopy-*` crates (this is the leaf).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod path;
pub mod value;
pub mod version;

// Re-export primary types for ergonomic imports.
pub use error::DslParsingError;
pub use path::ElementPath;
pub use value::{from_yaml_str, from_yaml_value, kind_name};
pub use version::DslVersion;
