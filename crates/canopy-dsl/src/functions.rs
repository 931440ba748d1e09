//! # Intrinsic Function Detection
//!
//! Blueprints may defer a property value to deploy time by writing a
//! single-key mapping whose key is one of the intrinsic function names
//! (`{ get_input: port }`). Such values cannot be type-checked statically,
//! so the value validator accepts them as-is wherever a value is expected.
//! Evaluating the functions themselves is the runtime's job, not ours.

use serde_json::Value;

/// Names recognized as intrinsic functions.
pub const INTRINSIC_FUNCTION_NAMES: &[&str] = &[
    "get_input",
    "get_property",
    "get_attribute",
    "get_secret",
    "concat",
];

/// The intrinsic function name when `value` is an intrinsic call.
pub fn intrinsic_name(value: &Value) -> Option<&str> {
    let mapping = value.as_object()?;
    if mapping.len() != 1 {
        return None;
    }
    let key = mapping.keys().next()?;
    INTRINSIC_FUNCTION_NAMES
        .contains(&key.as_str())
        .then_some(key.as_str())
}

/// True when `value` is a single-key mapping keyed by an intrinsic
/// function name.
pub fn is_intrinsic(value: &Value) -> bool {
    intrinsic_name(value).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detects_single_key_intrinsics() {
        assert!(is_intrinsic(&json!({ "get_input": "port" })));
        assert!(is_intrinsic(&json!({ "concat": ["a", "b"] })));
        assert_eq!(
            intrinsic_name(&json!({ "get_secret": "token" })),
            Some("get_secret")
        );
    }

    #[test]
    fn test_rejects_lookalikes() {
        // Two keys means a plain mapping, even if one key matches.
        assert!(!is_intrinsic(&json!({ "get_input": "port", "other": 1 })));
        assert!(!is_intrinsic(&json!({ "get_output": "port" })));
        assert!(!is_intrinsic(&json!("get_input")));
        assert!(!is_intrinsic(&json!({})));
    }
}
