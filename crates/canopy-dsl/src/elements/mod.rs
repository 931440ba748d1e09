//! # Element Behavior
//!
//! Validate/parse behavior per element kind. Most kinds use the generic
//! parse (leaves echo their raw value, containers assemble their children's
//! results); the type system, operations, and templates carry their own
//! logic in the submodules.

use canopy_core::DslParsingError;
use serde_json::{Map, Value};

use crate::element::Element;
use crate::evaluator::EvalContext;
use crate::schema::{ElementKind, SchemaDecl};

pub mod data_types;
pub mod misc;
pub mod node_types;
pub mod operation;
pub mod plugins;
pub mod templates;

/// Validation dispatch. Kinds without entries have nothing to check beyond
/// the shape already enforced at tree building.
pub fn validate(ctx: &EvalContext<'_>, element: &Element) -> Result<(), DslParsingError> {
    match element.kind {
        ElementKind::Blueprint => misc::validate_blueprint(ctx, element),
        ElementKind::Imports => misc::validate_imports(ctx, element),
        ElementKind::InterfaceOperations => misc::validate_interface_operations(ctx, element),
        ElementKind::Plugin => plugins::validate_plugin(ctx, element),
        ElementKind::DataTypeDef => data_types::validate_data_type(ctx, element),
        ElementKind::Operation => operation::validate_operation(ctx, element),
        ElementKind::NodeTemplate => templates::validate_node_template(ctx, element),
        _ => Ok(()),
    }
}

/// Parse dispatch.
pub fn parse(ctx: &EvalContext<'_>, element: &Element) -> Result<Value, DslParsingError> {
    match element.kind {
        ElementKind::Blueprint => misc::parse_blueprint(ctx, element),
        ElementKind::DataTypeDef => data_types::parse_data_type(ctx, element),
        ElementKind::DataTypes => data_types::parse_data_types(ctx, element),
        ElementKind::NodeType => node_types::parse_node_type(ctx, element),
        ElementKind::Operation => operation::parse_operation(ctx, element),
        ElementKind::NodeTemplate => templates::parse_node_template(ctx, element),
        _ => Ok(generic_parse(ctx, element)),
    }
}

/// Default parse by schema shape: leaves echo their raw value, fixed-key
/// and dynamic mappings assemble child results, lists collect in order.
pub fn generic_parse(ctx: &EvalContext<'_>, element: &Element) -> Value {
    match element.kind.schema() {
        SchemaDecl::Leaf(_) | SchemaDecl::Alternatives(_) => {
            element.raw_value().cloned().unwrap_or(Value::Null)
        }
        SchemaDecl::Fields(_) => {
            let mut mapping = Map::new();
            for &child in &element.children {
                let child = ctx.arena.get(child);
                match &child.computed {
                    Some(Value::Null) | None => {}
                    Some(value) => {
                        mapping.insert(child.name.clone(), value.clone());
                    }
                }
            }
            Value::Object(mapping)
        }
        SchemaDecl::Map(_) => {
            let mut mapping = Map::new();
            for &child in &element.children {
                let child = ctx.arena.get(child);
                mapping.insert(
                    child.name.clone(),
                    child.computed.clone().unwrap_or(Value::Null),
                );
            }
            Value::Object(mapping)
        }
        SchemaDecl::List(_) => Value::Array(
            element
                .children
                .iter()
                .map(|&child| ctx.arena.get(child).computed.clone().unwrap_or(Value::Null))
                .collect(),
        ),
    }
}
