//! Root, imports, reusable interfaces, and outputs.

use std::collections::HashSet;

use canopy_core::{DslParsingError, DslVersion};
use serde_json::{Map, Value};

use crate::constants::DEFINITIONS_VERSION_KEY;
use crate::element::Element;
use crate::evaluator::EvalContext;

/// Gate sections on the revisions that introduced them.
pub fn validate_blueprint(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<(), DslParsingError> {
    let data_types = ctx
        .arena
        .child_named(element.id, "data_types")
        .map(|id| ctx.arena.get(id));
    if let Some(data_types) = data_types {
        if data_types.raw_value().is_some() && !ctx.version.supports(DslVersion::V1_2) {
            return Err(DslParsingError::VersionMismatch {
                path: ctx.arena.path(data_types.id),
                feature: "data_types".to_string(),
                required: DslVersion::V1_2.as_definitions_string(),
                declared: ctx.version.as_definitions_string(),
            });
        }
    }
    Ok(())
}

/// Assemble the root result from the section children.
///
/// The pinned `definitions_version` is consumed by the entry point and is
/// not echoed into the plan body.
pub fn parse_blueprint(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<Value, DslParsingError> {
    let mut mapping = Map::new();
    for &child in &element.children {
        let child = ctx.arena.get(child);
        // Sections the document never declared stay out of the result;
        // container kinds would otherwise surface as empty collections.
        if child.name == DEFINITIONS_VERSION_KEY || child.raw_value().is_none() {
            continue;
        }
        match &child.computed {
            Some(Value::Null) | None => {}
            Some(value) => {
                mapping.insert(child.name.clone(), value.clone());
            }
        }
    }
    Ok(Value::Object(mapping))
}

/// Imports arrive pre-resolved; the only remaining rule is uniqueness.
pub fn validate_imports(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<(), DslParsingError> {
    let mut seen = HashSet::new();
    for &child in &element.children {
        if let Some(import) = ctx.arena.get(child).raw_value().and_then(Value::as_str) {
            if !seen.insert(import) {
                return Err(DslParsingError::Format {
                    path: ctx.arena.path(element.id),
                    message: format!("import '{import}' appears more than once"),
                });
            }
        }
    }
    Ok(())
}

/// An interface declaration must list at least one operation, each once.
pub fn validate_interface_operations(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<(), DslParsingError> {
    if element.raw_value().is_some() && element.children.is_empty() {
        return Err(DslParsingError::Format {
            path: ctx.arena.path(element.id),
            message: "interface must declare at least one operation".to_string(),
        });
    }
    let mut seen = HashSet::new();
    for &child in &element.children {
        if let Some(name) = ctx.arena.get(child).raw_value().and_then(Value::as_str) {
            if !seen.insert(name) {
                return Err(DslParsingError::Format {
                    path: ctx.arena.path(element.id),
                    message: format!("operation '{name}' appears more than once"),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementArena;
    use crate::evaluator::{Evaluator, NoResources};
    use serde_json::json;

    fn evaluate(document: Value) -> Result<Value, DslParsingError> {
        let arena = ElementArena::build(&document)?;
        Evaluator::new(arena, DslVersion::V1_2, &NoResources).evaluate()
    }

    #[test]
    fn test_duplicate_import_is_format_error() {
        let err = evaluate(json!({ "imports": ["a.yaml", "b.yaml", "a.yaml"] })).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("a.yaml"));
    }

    #[test]
    fn test_imports_echoed_in_order() {
        let value = evaluate(json!({ "imports": ["b.yaml", "a.yaml"] })).unwrap();
        assert_eq!(value["imports"], json!(["b.yaml", "a.yaml"]));
    }

    #[test]
    fn test_duplicate_interface_operation() {
        let err = evaluate(json!({
            "interfaces": { "lifecycle": { "operations": ["create", "create"] } }
        }))
        .unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("interfaces.lifecycle.operations"));
    }

    #[test]
    fn test_empty_interface_operations() {
        let err = evaluate(json!({
            "interfaces": { "lifecycle": { "operations": [] } }
        }))
        .unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_data_types_gated_on_revision() {
        let arena = ElementArena::build(&json!({ "data_types": {} })).unwrap();
        let err = Evaluator::new(arena, DslVersion::V1_0, &NoResources)
            .evaluate()
            .unwrap_err();
        assert_eq!(err.code(), 81);
    }

    #[test]
    fn test_outputs_pass_through() {
        let value = evaluate(json!({
            "outputs": {
                "endpoint": { "description": "url", "value": { "concat": ["http://", "h"] } }
            }
        }))
        .unwrap();
        assert_eq!(
            value["outputs"]["endpoint"]["value"],
            json!({ "concat": ["http://", "h"] })
        );
    }
}
