//! # Property Schemas and the Value Validator
//!
//! The structural heart of the type system. A [`TypeSchema`] maps property
//! names to [`PropertySchemaEntry`] records, insertion-ordered. Schemas
//! merge field-level across `derived_from` chains, and
//! [`merge_schema_and_instance_properties`] folds instance values over a
//! schema, filling defaults and type-checking recursively. The validator is
//! idempotent: feeding its output back in with the same schema reproduces
//! the output unchanged, which is what lets default elaboration run in any
//! order.

use canopy_core::{kind_name, DslParsingError, ElementPath};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::is_primitive;
use crate::functions::is_intrinsic;

/// Schema of one declared property.
///
/// Fields are optional so that merging can tell "declared as" apart from
/// "inherited". `required` defaults to true when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchemaEntry {
    /// Declared type name; primitive or a declared data type. Unset means
    /// any value is accepted.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Default value used when the instance supplies none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a value must be produced. Unset means required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl PropertySchemaEntry {
    /// Effective required flag.
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true)
    }

    /// Field-level overlay: fields set on `child` win, unset fields
    /// inherit from `self`.
    pub fn overlay(&self, child: &Self) -> Self {
        Self {
            type_name: child.type_name.clone().or_else(|| self.type_name.clone()),
            default: child.default.clone().or_else(|| self.default.clone()),
            description: child
                .description
                .clone()
                .or_else(|| self.description.clone()),
            required: child.required.or(self.required),
        }
    }
}

/// Insertion-ordered property name to schema entry mapping.
pub type TypeSchema = IndexMap<String, PropertySchemaEntry>;

const SCHEMA_ENTRY_KEYS: &[&str] = &["type", "default", "description", "required"];

/// Parse a raw `properties` mapping into a [`TypeSchema`].
///
/// # Errors
///
/// Format errors name the dotted path of the malformed entry.
pub fn schema_from_value(raw: &Value, path: &ElementPath) -> Result<TypeSchema, DslParsingError> {
    let Some(mapping) = raw.as_object() else {
        return Err(DslParsingError::Format {
            path: path.clone(),
            message: format!("expected mapping but got {}", kind_name(raw)),
        });
    };
    let mut schema = TypeSchema::new();
    for (name, entry_raw) in mapping {
        let entry_path = path.join(name.clone());
        let Some(fields) = entry_raw.as_object() else {
            return Err(DslParsingError::Format {
                path: entry_path,
                message: format!(
                    "property schema must be a mapping but got {}",
                    kind_name(entry_raw)
                ),
            });
        };
        for key in fields.keys() {
            if !SCHEMA_ENTRY_KEYS.contains(&key.as_str()) {
                return Err(DslParsingError::Format {
                    path: entry_path.clone(),
                    message: format!("unknown key '{key}' in property schema"),
                });
            }
        }
        let mut entry = PropertySchemaEntry::default();
        if let Some(type_name) = fields.get("type") {
            entry.type_name = Some(expect_string(type_name, "type", &entry_path)?);
        }
        if let Some(description) = fields.get("description") {
            entry.description = Some(expect_string(description, "description", &entry_path)?);
        }
        if let Some(required) = fields.get("required") {
            let Some(flag) = required.as_bool() else {
                return Err(DslParsingError::Format {
                    path: entry_path,
                    message: format!(
                        "'required' must be a boolean but got {}",
                        kind_name(required)
                    ),
                });
            };
            entry.required = Some(flag);
        }
        match fields.get("default") {
            Some(Value::Null) | None => {}
            Some(default) => entry.default = Some(default.clone()),
        }
        schema.insert(name.clone(), entry);
    }
    Ok(schema)
}

fn expect_string(
    value: &Value,
    key: &str,
    path: &ElementPath,
) -> Result<String, DslParsingError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DslParsingError::Format {
            path: path.clone(),
            message: format!("'{key}' must be a string but got {}", kind_name(value)),
        })
}

/// Serialize a schema back into the value model.
pub fn schema_to_value(schema: &TypeSchema) -> Value {
    let mut mapping = Map::with_capacity(schema.len());
    for (name, entry) in schema {
        // Serialization of a plain struct into the value model cannot fail.
        let value = serde_json::to_value(entry).unwrap_or(Value::Null);
        mapping.insert(name.clone(), value);
    }
    Value::Object(mapping)
}

/// Merge a child schema over its parent's, field-level per property.
pub fn merge_schemas(parent: &TypeSchema, child: &TypeSchema) -> TypeSchema {
    let mut merged = parent.clone();
    for (name, child_entry) in child {
        let entry = match merged.get(name) {
            Some(parent_entry) => parent_entry.overlay(child_entry),
            None => child_entry.clone(),
        };
        merged.insert(name.clone(), entry);
    }
    merged
}

/// Name to default mapping for every entry carrying a default.
pub fn flatten_schema(schema: &TypeSchema) -> Map<String, Value> {
    schema
        .iter()
        .filter_map(|(name, entry)| {
            entry
                .default
                .as_ref()
                .map(|default| (name.clone(), default.clone()))
        })
        .collect()
}

/// Reject declared property types that are neither primitive nor known.
///
/// # Errors
///
/// Returns [`DslParsingError::UnknownType`] naming the offending property
/// path.
pub fn validate_schema_type_names(
    schema: &TypeSchema,
    is_known: impl Fn(&str) -> bool,
    path: &ElementPath,
) -> Result<(), DslParsingError> {
    for (name, entry) in schema {
        if let Some(type_name) = entry.type_name.as_deref() {
            if !is_primitive(type_name) && !is_known(type_name) {
                return Err(DslParsingError::UnknownType {
                    path: path.join(name.clone()),
                    type_name: type_name.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Registry of resolved data type schemas, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct DataTypeRegistry {
    types: IndexMap<String, TypeSchema>,
}

impl DataTypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a type's schema.
    pub fn insert(&mut self, name: impl Into<String>, schema: TypeSchema) {
        self.types.insert(name.into(), schema);
    }

    /// Look up a type's schema.
    pub fn get(&self, name: &str) -> Option<&TypeSchema> {
        self.types.get(name)
    }

    /// True when a type by that name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Rebuild a registry from a parsed `data_types` plan section.
    ///
    /// # Errors
    ///
    /// Format error when the section value is not in the shape this crate
    /// itself produced.
    pub fn from_section(section: &Value) -> Result<Self, DslParsingError> {
        let mut registry = Self::new();
        let Some(mapping) = section.as_object() else {
            return Ok(registry);
        };
        for (name, record) in mapping {
            let properties = record.get("properties").cloned().unwrap_or(Value::Null);
            let schema = if properties.is_null() {
                TypeSchema::new()
            } else {
                serde_json::from_value(properties).map_err(|e| DslParsingError::Format {
                    path: ElementPath::from_segments(["data_types", name]),
                    message: format!("malformed resolved type record: {e}"),
                })?
            };
            registry.insert(name.clone(), schema);
        }
        Ok(registry)
    }
}

/// Validate one value against a declared type name.
///
/// Intrinsic function calls bypass the check entirely. Data-type values
/// recurse through [`merge_schema_and_instance_properties`], so the result
/// comes back fully default-elaborated.
///
/// # Errors
///
/// Type mismatches report code 50 with the dotted path; unknown type names
/// report code 39.
pub fn parse_value(
    value: &Value,
    type_name: Option<&str>,
    registry: &DataTypeRegistry,
    path: &ElementPath,
) -> Result<Value, DslParsingError> {
    let Some(type_name) = type_name else {
        return Ok(value.clone());
    };
    if is_intrinsic(value) {
        return Ok(value.clone());
    }
    let mismatch = || DslParsingError::TypeMismatch {
        path: path.clone(),
        expected: type_name.to_string(),
        actual: kind_name(value).to_string(),
    };
    match type_name {
        "integer" => {
            if value.is_i64() || value.is_u64() {
                Ok(value.clone())
            } else {
                Err(mismatch())
            }
        }
        "float" => {
            if value.is_number() {
                Ok(value.clone())
            } else {
                Err(mismatch())
            }
        }
        "boolean" => {
            if value.is_boolean() {
                Ok(value.clone())
            } else {
                Err(mismatch())
            }
        }
        "string" => {
            if value.is_string() {
                Ok(value.clone())
            } else {
                Err(mismatch())
            }
        }
        declared => {
            let Some(schema) = registry.get(declared) else {
                return Err(DslParsingError::UnknownType {
                    path: path.clone(),
                    type_name: declared.to_string(),
                });
            };
            let Some(instance) = value.as_object() else {
                return Err(mismatch());
            };
            let merged = merge_schema_and_instance_properties(schema, instance, registry, path)?;
            Ok(Value::Object(merged))
        }
    }
}

/// Fold instance values over a schema, filling defaults and type-checking.
///
/// Output is one entry per schema property in schema order. A `null`
/// instance value counts as unset. Optional properties with neither a
/// value nor a default are omitted.
///
/// # Errors
///
/// - code 106 for an instance key the schema does not declare,
/// - code 107 for a required property with neither value nor default,
/// - code 50/39 propagated from nested value checks, with the nested
///   dotted path.
pub fn merge_schema_and_instance_properties(
    schema: &TypeSchema,
    instance: &Map<String, Value>,
    registry: &DataTypeRegistry,
    path: &ElementPath,
) -> Result<Map<String, Value>, DslParsingError> {
    for key in instance.keys() {
        if !schema.contains_key(key) {
            return Err(DslParsingError::UndefinedProperty {
                path: path.join(key.clone()),
                property: key.clone(),
            });
        }
    }
    let mut merged = Map::with_capacity(schema.len());
    for (name, entry) in schema {
        // A null instance value means "unset"; fall through to the default.
        let supplied = instance
            .get(name)
            .filter(|value| !value.is_null())
            .or(entry.default.as_ref());
        match supplied {
            Some(value) => {
                let checked = parse_value(
                    value,
                    entry.type_name.as_deref(),
                    registry,
                    &path.join(name.clone()),
                )?;
                merged.insert(name.clone(), checked);
            }
            None if entry.is_required() => {
                return Err(DslParsingError::MissingProperty {
                    path: path.join(name.clone()),
                    property: name.clone(),
                });
            }
            None => {}
        }
    }
    Ok(merged)
}

/// Validate and elaborate every declared default in `schema` in place.
///
/// Defaults of data-type-shaped properties come back deep-merged with the
/// referenced type's own defaults. Safe to call repeatedly; the validator
/// is idempotent.
///
/// # Errors
///
/// Propagates validation failures with the property's dotted path.
pub fn elaborate_schema_defaults(
    schema: &mut TypeSchema,
    registry: &DataTypeRegistry,
    path: &ElementPath,
) -> Result<(), DslParsingError> {
    for (name, entry) in schema.iter_mut() {
        if let Some(default) = entry.default.take() {
            let elaborated = parse_value(
                &default,
                entry.type_name.as_deref(),
                registry,
                &path.join(name.clone()),
            )?;
            entry.default = Some(elaborated);
        }
    }
    Ok(())
}
