//! # Data Type Definitions
//!
//! Each definition resolves its own property schemas and deep-merges them
//! over its parent's (derivation edges order parents first). Default
//! elaboration runs at the section level, once every definition is merged:
//! the value validator recurses through referenced types on demand, so the
//! only precondition is that default-bearing references are acyclic. A type
//! may reference itself or a mutual partner freely as long as no default
//! forces the reference to expand.

use canopy_core::DslParsingError;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::constants::{is_primitive, PRIMITIVE_TYPES};
use crate::element::Element;
use crate::evaluator::EvalContext;
use crate::graph::DependencyGraph;
use crate::properties::{
    elaborate_schema_defaults, merge_schemas, schema_from_value, schema_to_value,
    validate_schema_type_names, DataTypeRegistry, TypeSchema,
};

/// User types may not shadow the primitive type names.
pub fn validate_data_type(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<(), DslParsingError> {
    if is_primitive(&element.name) {
        return Err(DslParsingError::InvalidTypeName {
            path: ctx.arena.path(element.id),
            type_name: element.name.clone(),
        });
    }
    Ok(())
}

/// Resolve one definition: own schema, type-name checks, parent merge.
pub fn parse_data_type(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<Value, DslParsingError> {
    let properties_path = ctx.arena.path(element.id).join("properties");
    let own_schema = match ctx
        .arena
        .child_named(element.id, "properties")
        .and_then(|id| ctx.arena.get(id).raw_value().cloned())
    {
        Some(raw) => schema_from_value(&raw, &properties_path)?,
        None => TypeSchema::new(),
    };

    // Sibling names are known from the tree even before they parse.
    let declared = sibling_names(ctx, element);
    validate_schema_type_names(
        &own_schema,
        |name| declared.iter().any(|declared| declared == name),
        &properties_path,
    )?;

    let merged = match parent_schema(ctx, element)? {
        Some(parent) => merge_schemas(&parent, &own_schema),
        None => own_schema,
    };

    let mut record = Map::new();
    record.insert("properties".to_string(), schema_to_value(&merged));
    for field in ["derived_from", "description", "version"] {
        match ctx.arena.child_computed(element.id, field) {
            Value::Null => {}
            value => {
                record.insert(field.to_string(), value);
            }
        }
    }
    Ok(Value::Object(record))
}

/// Names of every definition in the same section.
fn sibling_names(ctx: &EvalContext<'_>, element: &Element) -> Vec<String> {
    let Some(container) = element.parent else {
        return Vec::new();
    };
    ctx.arena
        .get(container)
        .children
        .iter()
        .map(|&id| ctx.arena.get(id).name.clone())
        .collect()
}

/// The already-parsed merged schema of the `derived_from` target.
fn parent_schema(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<Option<TypeSchema>, DslParsingError> {
    let Some(parent_name) = ctx
        .arena
        .child_named(element.id, "derived_from")
        .and_then(|id| ctx.arena.get(id).raw_value())
        .and_then(Value::as_str)
    else {
        return Ok(None);
    };
    let Some(container) = element.parent else {
        return Ok(None);
    };
    // Derivation edges guarantee the target parsed first.
    let record = ctx
        .arena
        .child_named(container, parent_name)
        .and_then(|id| ctx.arena.get(id).computed.clone())
        .unwrap_or(Value::Null);
    let properties = record.get("properties").cloned().unwrap_or(Value::Null);
    if properties.is_null() {
        return Ok(Some(TypeSchema::new()));
    }
    let schema =
        serde_json::from_value(properties).map_err(|e| DslParsingError::Format {
            path: ctx.arena.path(element.id),
            message: format!("malformed resolved parent type: {e}"),
        })?;
    Ok(Some(schema))
}

/// Resolve the whole section: cycle-check default-bearing references, then
/// elaborate every declared default against the full registry.
pub fn parse_data_types(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<Value, DslParsingError> {
    let mut records: IndexMap<String, Map<String, Value>> = IndexMap::new();
    let mut schemas: IndexMap<String, TypeSchema> = IndexMap::new();
    for &child in &element.children {
        let child = ctx.arena.get(child);
        let Some(Value::Object(record)) = child.computed.clone() else {
            continue;
        };
        let properties = record.get("properties").cloned().unwrap_or(Value::Null);
        let schema = if properties.is_null() {
            TypeSchema::new()
        } else {
            serde_json::from_value(properties).map_err(|e| DslParsingError::Format {
                path: ctx.arena.path(child.id),
                message: format!("malformed resolved type record: {e}"),
            })?
        };
        schemas.insert(child.name.clone(), schema);
        records.insert(child.name.clone(), record);
    }

    check_default_reference_cycles(&schemas)?;

    let mut registry = DataTypeRegistry::new();
    for (name, schema) in &schemas {
        registry.insert(name.clone(), schema.clone());
    }

    let section_path = ctx.arena.path(element.id);
    let mut section = Map::with_capacity(records.len());
    for (name, mut record) in records {
        let mut schema = schemas
            .get(&name)
            .cloned()
            .unwrap_or_default();
        elaborate_schema_defaults(
            &mut schema,
            &registry,
            &section_path.join(name.clone()).join("properties"),
        )?;
        record.insert("properties".to_string(), schema_to_value(&schema));
        section.insert(name, Value::Object(record));
    }
    Ok(Value::Object(section))
}

/// Reject cycles among references that a default would force to expand.
///
/// An edge exists from a type to each non-primitive property type whose
/// entry carries a default; elaborating that default must expand the
/// referenced type, so such edges cycling means infinite expansion.
fn check_default_reference_cycles(
    schemas: &IndexMap<String, TypeSchema>,
) -> Result<(), DslParsingError> {
    let mut graph = DependencyGraph::new();
    for (name, schema) in schemas {
        graph.add_node(name.clone());
        for entry in schema.values() {
            if entry.default.is_none() {
                continue;
            }
            if let Some(type_name) = entry.type_name.as_deref() {
                if !PRIMITIVE_TYPES.contains(&type_name) && schemas.contains_key(type_name) {
                    graph.add_edge(name.clone(), type_name.to_string());
                }
            }
        }
    }
    graph
        .topo_order()
        .map(|_| ())
        .map_err(|names| DslParsingError::Cycle { names })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::DslVersion;
    use serde_json::json;

    use crate::element::ElementArena;
    use crate::evaluator::{Evaluator, NoResources};

    fn evaluate(document: Value) -> Result<Value, DslParsingError> {
        let arena = ElementArena::build(&document)?;
        Evaluator::new(arena, DslVersion::V1_2, &NoResources).evaluate()
    }

    #[test]
    fn test_primitive_shadow_is_rejected() {
        let err = evaluate(json!({
            "data_types": { "string": { "properties": {} } }
        }))
        .unwrap_err();
        assert_eq!(err.code(), 1);
        assert!(err.to_string().contains("data_types.string"));
    }

    #[test]
    fn test_unknown_property_type() {
        let err = evaluate(json!({
            "data_types": { "a": { "properties": { "p": { "type": "mystery" } } } }
        }))
        .unwrap_err();
        assert_eq!(err.code(), 39);
        assert!(err.to_string().contains("data_types.a.properties.p"));
    }

    #[test]
    fn test_derivation_merges_field_level() {
        let value = evaluate(json!({
            "data_types": {
                "base": {
                    "properties": {
                        "host": { "type": "string", "default": "localhost" }
                    }
                },
                "extended": {
                    "derived_from": "base",
                    "properties": { "host": { "default": "ubuntu" } }
                }
            }
        }))
        .unwrap();
        let host = &value["data_types"]["extended"]["properties"]["host"];
        assert_eq!(host["type"], json!("string"));
        assert_eq!(host["default"], json!("ubuntu"));
    }

    #[test]
    fn test_defaults_elaborate_across_types() {
        let value = evaluate(json!({
            "data_types": {
                "connection": {
                    "properties": {
                        "host": { "type": "string", "default": "localhost" },
                        "port": { "type": "integer", "default": 22 }
                    }
                },
                "agent": {
                    "properties": {
                        "connection": { "type": "connection", "default": { "port": 2222 } }
                    }
                }
            }
        }))
        .unwrap();
        assert_eq!(
            value["data_types"]["agent"]["properties"]["connection"]["default"],
            json!({ "host": "localhost", "port": 2222 })
        );
    }

    #[test]
    fn test_default_bearing_self_reference_is_a_cycle() {
        let err = evaluate(json!({
            "data_types": {
                "infinite": {
                    "properties": {
                        "next": { "type": "infinite", "default": {} }
                    }
                }
            }
        }))
        .unwrap_err();
        assert_eq!(err.code(), 100);
        assert_eq!(err.cycle_path().unwrap(), ["infinite", "infinite"]);
    }

    #[test]
    fn test_self_reference_without_default_is_legal() {
        let value = evaluate(json!({
            "data_types": {
                "node": {
                    "properties": {
                        "next": { "type": "node", "required": false },
                        "label": { "type": "string", "default": "leaf" }
                    }
                }
            }
        }))
        .unwrap();
        assert_eq!(
            value["data_types"]["node"]["properties"]["next"]["type"],
            json!("node")
        );
    }

    #[test]
    fn test_mutual_reference_without_defaults_is_legal() {
        let value = evaluate(json!({
            "data_types": {
                "a": { "properties": { "b": { "type": "b", "required": false } } },
                "b": { "properties": { "a": { "type": "a", "required": false } } }
            }
        }))
        .unwrap();
        assert!(value["data_types"]["a"].is_object());
        assert!(value["data_types"]["b"].is_object());
    }

    #[test]
    fn test_default_cycle_across_types() {
        let err = evaluate(json!({
            "data_types": {
                "a": { "properties": { "b": { "type": "b", "default": {} } } },
                "b": { "properties": { "a": { "type": "a", "default": {} } } }
            }
        }))
        .unwrap_err();
        assert_eq!(err.code(), 100);
        let names = err.cycle_path().unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names.first(), names.last());
    }

    #[test]
    fn test_invalid_primitive_default() {
        let err = evaluate(json!({
            "data_types": {
                "a": { "properties": { "port": { "type": "integer", "default": "80" } } }
            }
        }))
        .unwrap_err();
        assert_eq!(err.code(), 50);
        assert!(err.to_string().contains("data_types.a.properties.port"));
    }
}
