//! # Requirement Resolution
//!
//! Elements declare what other elements they need evaluated first. Static
//! per-kind requirements locate targets by kind (an ancestor, a whole-tree
//! scan, or the element itself); instance-bound edges are added per
//! document for `derived_from` references. The resolved edges feed one
//! [`DependencyGraph`] that orders both evaluation passes.

use canopy_core::DslParsingError;

use crate::element::{ElementArena, ElementId};
use crate::graph::DependencyGraph;
use crate::schema::ElementKind;

/// How a requirement finds its target elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Ancestors of the given kind, nearest first.
    Ancestor(ElementKind),
    /// Every element of the given kind in the document.
    Scan(ElementKind),
    /// The requiring element itself.
    SelfRef,
}

/// How many targets a requirement expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one (or none, when not required).
    Single,
    /// Any number (at least one, when required).
    Multiple,
}

/// One declared requirement of an element kind.
#[derive(Debug, Clone, Copy)]
pub struct RequirementSpec {
    /// Target search strategy.
    pub locator: Locator,
    /// Expected target count.
    pub arity: Arity,
    /// Whether zero targets is an error.
    pub required: bool,
}

impl RequirementSpec {
    const fn single(locator: Locator) -> Self {
        Self {
            locator,
            arity: Arity::Single,
            required: true,
        }
    }
}

// Node type defaults elaborate against resolved data types, and interface
// references are checked against the declared section. The requirement
// sits on the definition, not its container, so it orders ahead of the
// definition's own parse.
const NODE_TYPE_REQUIREMENTS: &[RequirementSpec] = &[
    RequirementSpec::single(Locator::Scan(ElementKind::DataTypes)),
    RequirementSpec::single(Locator::Scan(ElementKind::Interfaces)),
];

// Templates consume every resolved registry.
const NODE_TEMPLATE_REQUIREMENTS: &[RequirementSpec] = &[
    RequirementSpec::single(Locator::Scan(ElementKind::NodeTypes)),
    RequirementSpec::single(Locator::Scan(ElementKind::DataTypes)),
    RequirementSpec::single(Locator::Scan(ElementKind::Plugins)),
    RequirementSpec::single(Locator::Scan(ElementKind::Interfaces)),
];

/// Static requirements per element kind.
///
/// Section containers exist for every document (fields are materialized
/// even when absent), so these single-arity scans always resolve.
pub fn requirements_of(kind: ElementKind) -> &'static [RequirementSpec] {
    match kind {
        ElementKind::NodeType => NODE_TYPE_REQUIREMENTS,
        ElementKind::NodeTemplate => NODE_TEMPLATE_REQUIREMENTS,
        _ => &[],
    }
}

/// Resolve one requirement for `from`, enforcing arity.
///
/// # Errors
///
/// Code 103 when a required target is missing, 104 when a single-arity
/// requirement matches more than one element.
pub fn resolve(
    arena: &ElementArena,
    from: ElementId,
    spec: &RequirementSpec,
) -> Result<Vec<ElementId>, DslParsingError> {
    let matches: Vec<ElementId> = match spec.locator {
        Locator::Ancestor(kind) => {
            let mut found = Vec::new();
            let mut cursor = from;
            while let Some(id) = arena.ancestor(cursor, kind) {
                found.push(id);
                cursor = id;
            }
            found
        }
        Locator::Scan(kind) => arena.find_all(kind),
        Locator::SelfRef => vec![from],
    };
    let target = match spec.locator {
        Locator::Ancestor(kind) | Locator::Scan(kind) => kind.describe(),
        Locator::SelfRef => arena.get(from).kind.describe(),
    };
    match spec.arity {
        Arity::Single if matches.len() > 1 => Err(DslParsingError::AmbiguousRequirement {
            path: arena.path(from),
            target: target.to_string(),
            count: matches.len(),
        }),
        _ if matches.is_empty() && spec.required => {
            Err(DslParsingError::UnresolvedRequirement {
                path: arena.path(from),
                target: target.to_string(),
            })
        }
        _ => Ok(matches),
    }
}

/// Build the full evaluation-order graph for a document.
///
/// Edges: every parent on its children, static per-kind requirements, and
/// `derived_from` references among sibling type definitions. Unknown
/// `derived_from` targets are rejected here (code 39).
pub fn build_edges(
    arena: &ElementArena,
) -> Result<DependencyGraph<ElementId>, DslParsingError> {
    let mut graph = DependencyGraph::new();
    for id in arena.ids() {
        graph.add_node(id);
        for child in &arena.get(id).children {
            graph.add_edge(id, *child);
        }
        for spec in requirements_of(arena.get(id).kind) {
            for target in resolve(arena, id, spec)? {
                graph.add_edge(id, target);
            }
        }
    }
    add_derivation_edges(arena, &mut graph, ElementKind::DataTypeDef)?;
    add_derivation_edges(arena, &mut graph, ElementKind::NodeType)?;
    tracing::debug!(nodes = graph.len(), "requirement graph resolved");
    Ok(graph)
}

/// Link each type definition to the sibling it derives from.
fn add_derivation_edges(
    arena: &ElementArena,
    graph: &mut DependencyGraph<ElementId>,
    kind: ElementKind,
) -> Result<(), DslParsingError> {
    for id in arena.find_all(kind) {
        let Some(derived_from) = arena.child_named(id, "derived_from") else {
            continue;
        };
        let Some(parent_name) = arena
            .get(derived_from)
            .raw_value()
            .and_then(|raw| raw.as_str())
        else {
            continue;
        };
        let Some(container) = arena.get(id).parent else {
            continue;
        };
        let Some(target) = arena.child_named(container, parent_name) else {
            return Err(DslParsingError::UnknownType {
                path: arena.path(derived_from),
                type_name: parent_name.to_string(),
            });
        };
        graph.add_edge(id, target);
    }
    Ok(())
}
