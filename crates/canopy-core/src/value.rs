//! # Raw Document Values
//!
//! The compiler core operates on `serde_json::Value` with insertion-ordered
//! mappings. Blueprints arrive as YAML, so this module owns the one-way
//! conversion from the JSON-compatible YAML subset into that model, plus a
//! small helper for naming a value's kind in diagnostics.

use crate::error::DslParsingError;
use serde_json::Value;

/// Convert a YAML value into the JSON value model.
///
/// Only the JSON-compatible subset is accepted: mapping keys must be
/// strings, and tagged values are rejected.
///
/// # Errors
///
/// Returns [`DslParsingError::InvalidYaml`] for non-string keys, tags, or
/// numbers outside the JSON range.
pub fn from_yaml_value(yaml: serde_yaml::Value) -> Result<Value, DslParsingError> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::from(u))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| DslParsingError::InvalidYaml {
                        message: format!("number '{n}' has no JSON representation"),
                    })
            } else {
                Err(DslParsingError::InvalidYaml {
                    message: format!("number '{n}' has no JSON representation"),
                })
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s)),
        serde_yaml::Value::Sequence(seq) => {
            let items = seq
                .into_iter()
                .map(from_yaml_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(items))
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = serde_json::Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                let serde_yaml::Value::String(key) = key else {
                    return Err(DslParsingError::InvalidYaml {
                        message: "mapping keys must be strings".into(),
                    });
                };
                object.insert(key, from_yaml_value(value)?);
            }
            Ok(Value::Object(object))
        }
        serde_yaml::Value::Tagged(tagged) => Err(DslParsingError::InvalidYaml {
            message: format!("unsupported YAML tag '{}'", tagged.tag),
        }),
    }
}

/// Load YAML text straight into the JSON value model.
///
/// # Errors
///
/// Returns [`DslParsingError::InvalidYaml`] when the text is not valid YAML
/// or uses constructs outside the JSON-compatible subset.
pub fn from_yaml_str(text: &str) -> Result<Value, DslParsingError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| DslParsingError::InvalidYaml {
            message: e.to_string(),
        })?;
    from_yaml_value(yaml)
}

/// Human name of a value's native kind, for diagnostics.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_f64() {
                "float"
            } else {
                "integer"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_conversion_preserves_key_order() {
        let value = from_yaml_str("z: 1\na: 2\nm: 3\n").unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_yaml_conversion_handles_nesting() {
        let value = from_yaml_str(
            "node_templates:\n  vm:\n    type: base\n    properties:\n      port: 8080\n      tags: [a, b]\n",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "node_templates": {
                    "vm": {
                        "type": "base",
                        "properties": { "port": 8080, "tags": ["a", "b"] }
                    }
                }
            })
        );
    }

    #[test]
    fn test_non_string_keys_rejected() {
        let err = from_yaml_str("1: one\n").unwrap_err();
        assert!(matches!(err, DslParsingError::InvalidYaml { .. }));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(kind_name(&json!(null)), "null");
        assert_eq!(kind_name(&json!(true)), "boolean");
        assert_eq!(kind_name(&json!(3)), "integer");
        assert_eq!(kind_name(&json!(3.5)), "float");
        assert_eq!(kind_name(&json!("s")), "string");
        assert_eq!(kind_name(&json!([])), "list");
        assert_eq!(kind_name(&json!({})), "mapping");
    }
}
