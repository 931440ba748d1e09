//! # Node Type Definitions
//!
//! Node types reuse the property-schema machinery of data types and add an
//! interface block. Both merge across `derived_from`: schemas field-level
//! per property, interfaces operation-level (a redeclared operation
//! replaces the inherited one wholesale). Defaults elaborate here, against
//! the already-resolved data type registry.

use canopy_core::DslParsingError;
use serde_json::{Map, Value};

use crate::element::{Element, ElementId};
use crate::evaluator::EvalContext;
use crate::properties::{
    elaborate_schema_defaults, merge_schemas, schema_from_value, schema_to_value,
    validate_schema_type_names, TypeSchema,
};
use crate::schema::ElementKind;

/// Resolve one node type: schema checks, parent merge, default
/// elaboration, interface merge.
pub fn parse_node_type(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<Value, DslParsingError> {
    let registry = ctx.data_type_registry()?;
    let properties_path = ctx.arena.path(element.id).join("properties");
    let own_schema = match ctx
        .arena
        .child_named(element.id, "properties")
        .and_then(|id| ctx.arena.get(id).raw_value().cloned())
    {
        Some(raw) => schema_from_value(&raw, &properties_path)?,
        None => TypeSchema::new(),
    };
    validate_schema_type_names(
        &own_schema,
        |name| registry.contains(name),
        &properties_path,
    )?;

    let parent_record = parent_record(ctx, element)?;
    let mut schema = match &parent_record {
        Some(record) => merge_schemas(&record_schema(ctx, element, record)?, &own_schema),
        None => own_schema,
    };
    elaborate_schema_defaults(&mut schema, &registry, &properties_path)?;

    check_interface_references(ctx, element)?;
    let own_interfaces = match ctx.arena.child_computed(element.id, "interfaces") {
        Value::Object(interfaces) => interfaces,
        _ => Map::new(),
    };
    let parent_interfaces = parent_record
        .as_ref()
        .and_then(|record| record.get("interfaces"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let interfaces = merge_interfaces(&parent_interfaces, &own_interfaces);

    let mut record = Map::new();
    record.insert("properties".to_string(), schema_to_value(&schema));
    record.insert("interfaces".to_string(), Value::Object(interfaces));
    match ctx.arena.child_computed(element.id, "derived_from") {
        Value::Null => {}
        value => {
            record.insert("derived_from".to_string(), value);
        }
    }
    Ok(Value::Object(record))
}

/// Operation-level merge: inherited operations survive unless redeclared.
pub fn merge_interfaces(
    parent: &Map<String, Value>,
    child: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = parent.clone();
    for (interface, operations) in child {
        let Some(operations) = operations.as_object() else {
            continue;
        };
        let base = merged
            .entry(interface.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(base) = base.as_object_mut() {
            for (name, declaration) in operations {
                base.insert(name.clone(), declaration.clone());
            }
        }
    }
    merged
}

/// The already-parsed record of the `derived_from` target.
fn parent_record(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<Option<Map<String, Value>>, DslParsingError> {
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
    let record = ctx
        .arena
        .child_named(container, parent_name)
        .and_then(|id| ctx.arena.get(id).computed.clone());
    match record {
        Some(Value::Object(record)) => Ok(Some(record)),
        _ => Ok(None),
    }
}

fn record_schema(
    ctx: &EvalContext<'_>,
    element: &Element,
    record: &Map<String, Value>,
) -> Result<TypeSchema, DslParsingError> {
    let properties = record.get("properties").cloned().unwrap_or(Value::Null);
    if properties.is_null() {
        return Ok(TypeSchema::new());
    }
    serde_json::from_value(properties).map_err(|e| DslParsingError::Format {
        path: ctx.arena.path(element.id),
        message: format!("malformed resolved parent type: {e}"),
    })
}

/// When the blueprint declares a top-level `interfaces` section, every
/// interface a node type references by name must exist there.
fn check_interface_references(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<(), DslParsingError> {
    let declared_section: Option<ElementId> = ctx.arena.find_unique(ElementKind::Interfaces);
    let section_present = declared_section
        .map(|id| ctx.arena.get(id).raw_value().is_some())
        .unwrap_or(false);
    if !section_present {
        return Ok(());
    }
    let declared = ctx
        .section("interfaces")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let Some(own_interfaces) = ctx.arena.child_named(element.id, "interfaces") else {
        return Ok(());
    };
    for &interface in &ctx.arena.get(own_interfaces).children {
        let name = &ctx.arena.get(interface).name;
        if !declared.contains_key(name) {
            return Err(DslParsingError::MissingInterface {
                type_name: element.name.clone(),
                interface: name.clone(),
            });
        }
    }
    Ok(())
}
