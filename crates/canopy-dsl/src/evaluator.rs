//! # Two-Phase Evaluator
//!
//! Drives the element tree through validation and parsing, each pass in
//! requirement-graph order so every element sees its dependencies finished
//! before it runs. The first failure marks the element `Failed` and aborts
//! the whole evaluation; there is no partial plan.

use canopy_core::{DslParsingError, DslVersion};
use indexmap::IndexMap;
use serde_json::Value;

use crate::element::{ElementArena, ElementId, EvalState};
use crate::elements;
use crate::properties::DataTypeRegistry;
use crate::requirements::build_edges;

/// Caller-supplied collaborator answering whether a named script resource
/// exists alongside the blueprint.
///
/// Operation implementations that match no declared plugin fall back to a
/// script lookup through this trait.
pub trait ResourceResolver {
    /// True when a resource by this name is available.
    fn resource_exists(&self, name: &str) -> bool;
}

/// Resolver for blueprints shipped without any side resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceResolver for NoResources {
    fn resource_exists(&self, _name: &str) -> bool {
        false
    }
}

/// Read-only view handed to element validate/parse functions.
pub struct EvalContext<'a> {
    /// The document tree.
    pub arena: &'a ElementArena,
    /// Declared DSL revision of the blueprint.
    pub version: DslVersion,
    /// Script-existence collaborator.
    pub resolver: &'a dyn ResourceResolver,
    /// Parse results of finished top-level sections, keyed by section name.
    pub provided: &'a IndexMap<&'static str, Value>,
}

impl EvalContext<'_> {
    /// Parse result of a finished section, when published.
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.provided.get(key)
    }

    /// Data type registry rebuilt from the finished `data_types` section.
    ///
    /// # Errors
    ///
    /// Format error when the published section is malformed, which would
    /// indicate a bug in the data type parse itself.
    pub fn data_type_registry(&self) -> Result<DataTypeRegistry, DslParsingError> {
        match self.section("data_types") {
            Some(section) => DataTypeRegistry::from_section(section),
            None => Ok(DataTypeRegistry::new()),
        }
    }
}

/// One evaluation run over a document tree.
pub struct Evaluator<'a> {
    arena: ElementArena,
    version: DslVersion,
    resolver: &'a dyn ResourceResolver,
    provided: IndexMap<&'static str, Value>,
}

impl<'a> Evaluator<'a> {
    /// Wrap an element tree for evaluation.
    pub fn new(
        arena: ElementArena,
        version: DslVersion,
        resolver: &'a dyn ResourceResolver,
    ) -> Self {
        Self {
            arena,
            version,
            resolver,
            provided: IndexMap::new(),
        }
    }

    /// Run both passes and return the root element's parse result.
    ///
    /// # Errors
    ///
    /// The first validation or parse failure, or a cycle among the
    /// requirement edges (code 100, named after the cyclic elements).
    pub fn evaluate(mut self) -> Result<Value, DslParsingError> {
        let graph = build_edges(&self.arena)?;
        let order = graph.topo_order().map_err(|cycle| DslParsingError::Cycle {
            names: cycle
                .iter()
                .map(|id| self.arena.get(*id).name.clone())
                .collect(),
        })?;

        tracing::debug!(elements = order.len(), "validation pass");
        for &id in &order {
            self.run_validate(id)?;
        }
        tracing::debug!(elements = order.len(), "parse pass");
        for &id in &order {
            self.run_parse(id)?;
        }

        let root = self.arena.get(self.arena.root());
        Ok(root.computed.clone().unwrap_or(Value::Null))
    }

    fn context(&self) -> EvalContext<'_> {
        EvalContext {
            arena: &self.arena,
            version: self.version,
            resolver: self.resolver,
            provided: &self.provided,
        }
    }

    fn run_validate(&mut self, id: ElementId) -> Result<(), DslParsingError> {
        self.arena.set_state(id, EvalState::Validating);
        let result = elements::validate(&self.context(), self.arena.get(id));
        match result {
            Ok(()) => {
                self.arena.set_state(id, EvalState::Validated);
                Ok(())
            }
            Err(error) => {
                tracing::debug!(path = %self.arena.path(id), %error, "validation failed");
                self.arena.set_state(id, EvalState::Failed);
                Err(error)
            }
        }
    }

    fn run_parse(&mut self, id: ElementId) -> Result<(), DslParsingError> {
        self.arena.set_state(id, EvalState::Parsing);
        let result = elements::parse(&self.context(), self.arena.get(id));
        match result {
            Ok(value) => {
                if let Some(key) = self.arena.get(id).kind.section_key() {
                    self.provided.insert(key, value.clone());
                }
                tracing::trace!(path = %self.arena.path(id), "parsed");
                self.arena.set_computed(id, value);
                self.arena.set_state(id, EvalState::Parsed);
                Ok(())
            }
            Err(error) => {
                tracing::debug!(path = %self.arena.path(id), %error, "parse failed");
                self.arena.set_state(id, EvalState::Failed);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluates_empty_blueprint() {
        let arena = ElementArena::build(&json!({})).unwrap();
        let value = Evaluator::new(arena, DslVersion::V1_2, &NoResources)
            .evaluate()
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_sections_are_published_in_dependency_order() {
        let arena = ElementArena::build(&json!({
            "data_types": { "t": { "properties": { "p": { "default": 1 } } } },
            "node_types": { "n": { "properties": { "q": { "type": "t", "default": {} } } } }
        }))
        .unwrap();
        let value = Evaluator::new(arena, DslVersion::V1_2, &NoResources)
            .evaluate()
            .unwrap();
        // Node type defaults were elaborated against the data type.
        assert_eq!(
            value["node_types"]["n"]["properties"]["q"]["default"],
            json!({ "p": 1 })
        );
    }

    #[test]
    fn test_derivation_cycle_is_code_100() {
        let arena = ElementArena::build(&json!({
            "data_types": {
                "a": { "derived_from": "b" },
                "b": { "derived_from": "a" }
            }
        }))
        .unwrap();
        let err = Evaluator::new(arena, DslVersion::V1_2, &NoResources)
            .evaluate()
            .unwrap_err();
        assert_eq!(err.code(), 100);
        let names = err.cycle_path().unwrap();
        assert_eq!(names.first(), names.last());
        assert!(names.contains(&"a".to_string()) && names.contains(&"b".to_string()));
    }
}
