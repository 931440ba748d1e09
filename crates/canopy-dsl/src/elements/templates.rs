//! # Node Templates
//!
//! A template instantiates a node type: instance properties fold over the
//! type's schema, template-level interfaces override type-level ones per
//! operation, and every mapped operation binds to a declared plugin. The
//! parse result is the per-node plan record.
//!
//! The operations index carries every operation under its qualified
//! `<interface>.<name>` key; the bare `<name>` is added as an alias only
//! while it is unambiguous, and dropped as soon as a second interface
//! declares an operation by the same name.

use canopy_core::DslParsingError;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::element::Element;
use crate::elements::node_types::merge_interfaces;
use crate::elements::operation::{resolve_operation, OperationDecl};
use crate::evaluator::EvalContext;
use crate::properties::{merge_schema_and_instance_properties, TypeSchema};
use crate::schema::ElementKind;

/// The declared node type must exist.
pub fn validate_node_template(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<(), DslParsingError> {
    let type_name = declared_type(ctx, element);
    let Some(node_types) = ctx.arena.find_unique(ElementKind::NodeTypes) else {
        return Ok(());
    };
    if ctx.arena.child_named(node_types, &type_name).is_none() {
        return Err(DslParsingError::UnknownNodeType {
            template: element.name.clone(),
            type_name,
        });
    }
    Ok(())
}

fn declared_type(ctx: &EvalContext<'_>, element: &Element) -> String {
    ctx.arena
        .child_named(element.id, "type")
        .and_then(|id| ctx.arena.get(id).raw_value())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Build the per-node plan record.
pub fn parse_node_template(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<Value, DslParsingError> {
    let type_name = declared_type(ctx, element);
    let type_record = ctx
        .section("node_types")
        .and_then(|section| section.get(&type_name))
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| DslParsingError::UnknownNodeType {
            template: element.name.clone(),
            type_name: type_name.clone(),
        })?;

    let schema: TypeSchema = match type_record.get("properties") {
        Some(properties) if !properties.is_null() => serde_json::from_value(
            properties.clone(),
        )
        .map_err(|e| DslParsingError::Format {
            path: ctx.arena.path(element.id),
            message: format!("malformed resolved node type: {e}"),
        })?,
        _ => TypeSchema::new(),
    };
    let instance = ctx
        .arena
        .child_named(element.id, "properties")
        .and_then(|id| ctx.arena.get(id).raw_value())
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let registry = ctx.data_type_registry()?;
    let properties = merge_schema_and_instance_properties(
        &schema,
        &instance,
        &registry,
        &ctx.arena.path(element.id).join("properties"),
    )?;

    let type_interfaces = type_record
        .get("interfaces")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let own_interfaces = match ctx.arena.child_computed(element.id, "interfaces") {
        Value::Object(interfaces) => interfaces,
        _ => Map::new(),
    };
    let interfaces = merge_interfaces(&type_interfaces, &own_interfaces);

    let plugins = ctx
        .section("plugins")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let (operations, used_plugins) =
        resolve_operations(ctx, element, &interfaces, &plugins)?;

    let mut record = Map::new();
    record.insert("id".to_string(), Value::String(element.name.clone()));
    record.insert("type".to_string(), Value::String(type_name));
    record.insert("properties".to_string(), Value::Object(properties));
    record.insert("operations".to_string(), Value::Object(operations));
    record.insert(
        "plugins".to_string(),
        Value::Array(used_plugins.into_iter().map(Value::String).collect()),
    );
    Ok(Value::Object(record))
}

/// Bind every merged operation and index it by qualified name, plus a
/// short alias where unambiguous.
fn resolve_operations(
    ctx: &EvalContext<'_>,
    element: &Element,
    interfaces: &Map<String, Value>,
    plugins: &Map<String, Value>,
) -> Result<(Map<String, Value>, Vec<String>), DslParsingError> {
    let mut short_name_counts: IndexMap<&str, usize> = IndexMap::new();
    for operations in interfaces.values() {
        if let Some(operations) = operations.as_object() {
            for name in operations.keys() {
                *short_name_counts.entry(name.as_str()).or_default() += 1;
            }
        }
    }

    let mut resolved = Map::new();
    let mut used_plugins: IndexSet<String> = IndexSet::new();
    for (interface, operations) in interfaces {
        let Some(operations) = operations.as_object() else {
            continue;
        };
        for (name, declaration) in operations {
            let decl: OperationDecl = serde_json::from_value(declaration.clone())
                .map_err(|e| DslParsingError::Format {
                    path: ctx.arena.path(element.id),
                    message: format!("malformed resolved operation: {e}"),
                })?;
            let qualified = format!("{interface}.{name}");
            let bound = resolve_operation(&qualified, &decl, plugins, ctx.resolver)?;
            if let Some(plugin) = &bound.plugin {
                used_plugins.insert(plugin.clone());
            }
            let bound = serde_json::to_value(&bound).map_err(|e| DslParsingError::Format {
                path: ctx.arena.path(element.id),
                message: format!("operation serialization failed: {e}"),
            })?;
            if short_name_counts.get(name.as_str()) == Some(&1) {
                resolved.insert(name.clone(), bound.clone());
            }
            resolved.insert(qualified, bound);
        }
    }
    Ok((resolved, used_plugins.into_iter().collect()))
}
