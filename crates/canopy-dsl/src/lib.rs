//! # canopy-dsl — The Canopy Blueprint Compiler
//!
//! Compiles a declarative, YAML-shaped orchestration blueprint into a fully
//! type-checked, default-elaborated deployment [`Plan`]. The pipeline:
//!
//! 1. **Tree building** ([`element`]): recursive descent over the declared
//!    schema ([`schema`]) turns the raw document into an element arena,
//!    rejecting shape violations at their dotted path.
//! 2. **Requirement resolution** ([`requirements`], [`graph`]): static and
//!    instance-bound edges order everything an element needs before it.
//! 3. **Two-phase evaluation** ([`evaluator`]): validate all elements in
//!    dependency order, then parse them, failing fast on the first error.
//! 4. **Type system** ([`properties`], [`elements`]): `derived_from`
//!    inheritance with field-level schema merge, recursive value checking,
//!    and default elaboration, with cycle detection over default-bearing
//!    references.
//! 5. **Plan assembly** ([`plan`]): resolved sections become the plan,
//!    operations bound to plugins by dotted-prefix matching.
//!
//! ## Key Design Principles
//!
//! 1. **Declare shape, derive behavior.** Document structure lives in one
//!    schema table; tree building, path reporting, and generic parsing all
//!    follow from it.
//!
//! 2. **Deterministic output.** Mappings preserve document order end to
//!    end, and evaluation order breaks ties by document order, so the same
//!    blueprint always compiles to the same plan.
//!
//! 3. **Fail fast, fail located.** The first violation aborts compilation
//!    with a stable numeric code and the dotted path of the offender.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod constants;
pub mod element;
pub mod elements;
pub mod evaluator;
pub mod functions;
pub mod graph;
pub mod plan;
pub mod properties;
pub mod requirements;
pub mod schema;

use canopy_core::from_yaml_str;
pub use canopy_core::{DslParsingError, DslVersion, ElementPath};
use serde_json::Value;

use crate::element::ElementArena;
pub use crate::evaluator::{Evaluator, NoResources, ResourceResolver};
pub use crate::plan::{Plan, PlanNode};

use crate::constants::DEFINITIONS_VERSION_KEY;

/// Compile a pre-loaded blueprint document against a DSL revision.
///
/// The document must be a mapping in the JSON value model (see
/// [`canopy_core::from_yaml_value`] for YAML ingestion). A
/// `definitions_version` key inside the document is accepted but ignored;
/// the `version` argument wins.
///
/// # Errors
///
/// Any [`DslParsingError`]; the first violation aborts compilation.
pub fn parse(document: &Value, version: DslVersion) -> Result<Plan, DslParsingError> {
    parse_with_resolver(document, version, &NoResources)
}

/// [`parse`] with a script-existence collaborator for resolving
/// operation implementations that match no declared plugin.
///
/// # Errors
///
/// Any [`DslParsingError`]; the first violation aborts compilation.
pub fn parse_with_resolver(
    document: &Value,
    version: DslVersion,
    resolver: &dyn ResourceResolver,
) -> Result<Plan, DslParsingError> {
    tracing::debug!(%version, "compiling blueprint");
    let arena = ElementArena::build(document)?;
    let root = Evaluator::new(arena, version, resolver).evaluate()?;
    Plan::from_root(root, version)
}

/// Compile blueprint YAML text.
///
/// The DSL revision is read from the document's `definitions_version` key,
/// defaulting to 1.0 when absent.
///
/// # Errors
///
/// Any [`DslParsingError`], including YAML load failures.
pub fn parse_yaml_str(text: &str) -> Result<Plan, DslParsingError> {
    parse_yaml_str_with_resolver(text, &NoResources)
}

/// [`parse_yaml_str`] with a script-existence collaborator.
///
/// # Errors
///
/// Any [`DslParsingError`], including YAML load failures.
pub fn parse_yaml_str_with_resolver(
    text: &str,
    resolver: &dyn ResourceResolver,
) -> Result<Plan, DslParsingError> {
    let document = from_yaml_str(text)?;
    let version = match document.get(DEFINITIONS_VERSION_KEY) {
        Some(Value::String(raw)) => DslVersion::parse(raw)?,
        Some(other) => {
            return Err(DslParsingError::UnsupportedVersion {
                raw: other.to_string(),
            })
        }
        None => DslVersion::V1_0,
    };
    parse_with_resolver(&document, version, resolver)
}
