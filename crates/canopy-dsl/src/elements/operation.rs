//! # Operation Declarations and Plugin Resolution
//!
//! An operation is declared either as a shorthand implementation string or
//! as a full mapping. Declarations normalize here into [`OperationDecl`];
//! binding to a declared plugin happens later, at node template parse,
//! once the merged interface set is known.
//!
//! Resolution matches the implementation against declared plugin names by
//! dotted prefix: `pkg.tasks.create` belongs to plugin `pkg`. When nothing
//! matches, the implementation is tried as a script resource name, which
//! synthesizes an invocation of the script plugin with the resource passed
//! through the reserved `script_path` input.

use canopy_core::{DslParsingError, DslVersion};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    is_executor, SCRIPT_PATH_PROPERTY, SCRIPT_PLUGIN_NAME, SCRIPT_PLUGIN_RUN_TASK,
};
use crate::element::Element;
use crate::evaluator::{EvalContext, ResourceResolver};

/// Normalized operation declaration, before plugin binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationDecl {
    /// Implementation string; empty for declared-but-unmapped operations.
    #[serde(default)]
    pub implementation: String,
    /// Explicit executor, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    /// Operation inputs, passed through to the invocation.
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Retry budget; -1 means retry forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i64>,
    /// Seconds between retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<f64>,
}

/// An operation bound to its plugin, ready for the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOperation {
    /// Bound plugin name; `None` for declared-but-unmapped operations.
    pub plugin: Option<String>,
    /// Task path inside the plugin; empty when unmapped.
    pub operation: String,
    /// Effective executor, defaulted from the plugin when not declared.
    pub executor: Option<String>,
    /// Invocation inputs.
    pub inputs: Map<String, Value>,
    /// Retry budget.
    pub max_retries: Option<i64>,
    /// Seconds between retries.
    pub retry_interval: Option<f64>,
}

/// `<interface>.<operation>` of an operation element, from its ancestry.
fn qualified_name(ctx: &EvalContext<'_>, element: &Element) -> String {
    match element.parent {
        Some(parent) => format!("{}.{}", ctx.arena.get(parent).name, element.name),
        None => element.name.clone(),
    }
}

/// Check executor legality and revision gates on the declared fields.
pub fn validate_operation(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<(), DslParsingError> {
    let operation = qualified_name(ctx, element);
    if let Some(executor_id) = ctx.arena.child_named(element.id, "executor") {
        if let Some(executor) = ctx.arena.get(executor_id).raw_value().and_then(Value::as_str)
        {
            if !is_executor(executor) {
                return Err(DslParsingError::IllegalExecutor {
                    operation,
                    executor: executor.to_string(),
                });
            }
        }
    }
    for (field, minimum) in [("max_retries", -1.0), ("retry_interval", 0.0)] {
        let Some(field_id) = ctx.arena.child_named(element.id, field) else {
            continue;
        };
        let Some(raw) = ctx.arena.get(field_id).raw_value() else {
            continue;
        };
        if !ctx.version.supports(DslVersion::V1_1) {
            return Err(DslParsingError::VersionMismatch {
                path: ctx.arena.path(field_id),
                feature: field.to_string(),
                required: DslVersion::V1_1.as_definitions_string(),
                declared: ctx.version.as_definitions_string(),
            });
        }
        if raw.as_f64().is_some_and(|value| value < minimum) {
            return Err(DslParsingError::Format {
                path: ctx.arena.path(field_id),
                message: format!("'{field}' must be at least {minimum}"),
            });
        }
    }
    Ok(())
}

/// Normalize shorthand or full-mapping declarations into one shape.
pub fn parse_operation(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<Value, DslParsingError> {
    let decl = match element.raw_value() {
        Some(Value::String(implementation)) => OperationDecl {
            implementation: implementation.clone(),
            ..OperationDecl::default()
        },
        _ => OperationDecl {
            implementation: ctx
                .arena
                .child_computed(element.id, "implementation")
                .as_str()
                .unwrap_or_default()
                .to_string(),
            executor: ctx
                .arena
                .child_computed(element.id, "executor")
                .as_str()
                .map(str::to_string),
            inputs: match ctx.arena.child_computed(element.id, "inputs") {
                Value::Object(inputs) => inputs,
                _ => Map::new(),
            },
            max_retries: ctx.arena.child_computed(element.id, "max_retries").as_i64(),
            retry_interval: ctx
                .arena
                .child_computed(element.id, "retry_interval")
                .as_f64(),
        },
    };
    serde_json::to_value(&decl).map_err(|e| DslParsingError::Format {
        path: ctx.arena.path(element.id),
        message: format!("operation normalization failed: {e}"),
    })
}

/// Bind a normalized declaration to a plugin.
///
/// # Errors
///
/// - code 91 when the implementation prefix-matches more than one plugin,
/// - code 60 when a script-backed operation declares `script_path` itself,
/// - code 61 when a script resolves but no `script` plugin is declared,
/// - code 10 when neither a plugin nor a script resource matches.
pub fn resolve_operation(
    qualified: &str,
    decl: &OperationDecl,
    plugins: &Map<String, Value>,
    resolver: &dyn ResourceResolver,
) -> Result<ResolvedOperation, DslParsingError> {
    if decl.implementation.is_empty() {
        // Declared but not mapped; kept in the plan so overrides and
        // workflow wiring can still see the operation exists.
        return Ok(ResolvedOperation {
            plugin: None,
            operation: String::new(),
            executor: None,
            inputs: decl.inputs.clone(),
            max_retries: decl.max_retries,
            retry_interval: decl.retry_interval,
        });
    }

    let candidates: Vec<&String> = plugins
        .keys()
        .filter(|name| {
            decl.implementation.len() > name.len()
                && decl.implementation.starts_with(name.as_str())
                && decl.implementation.as_bytes()[name.len()] == b'.'
        })
        .collect();

    match candidates.as_slice() {
        [plugin] => Ok(ResolvedOperation {
            operation: decl.implementation[plugin.len() + 1..].to_string(),
            executor: effective_executor(decl, plugins, plugin),
            plugin: Some((*plugin).clone()),
            inputs: decl.inputs.clone(),
            max_retries: decl.max_retries,
            retry_interval: decl.retry_interval,
        }),
        [] => resolve_as_script(qualified, decl, plugins, resolver),
        many => Err(DslParsingError::AmbiguousPluginMapping {
            operation: qualified.to_string(),
            implementation: decl.implementation.clone(),
            candidates: many.iter().map(|name| (*name).clone()).collect(),
        }),
    }
}

fn resolve_as_script(
    qualified: &str,
    decl: &OperationDecl,
    plugins: &Map<String, Value>,
    resolver: &dyn ResourceResolver,
) -> Result<ResolvedOperation, DslParsingError> {
    if !resolver.resource_exists(&decl.implementation) {
        return Err(DslParsingError::UnresolvableOperationMapping {
            operation: qualified.to_string(),
            implementation: decl.implementation.clone(),
        });
    }
    if !plugins.contains_key(SCRIPT_PLUGIN_NAME) {
        return Err(DslParsingError::MissingScriptPlugin {
            operation: qualified.to_string(),
            script: decl.implementation.clone(),
        });
    }
    if decl.inputs.contains_key(SCRIPT_PATH_PROPERTY) {
        return Err(DslParsingError::ReservedScriptPathInput {
            operation: qualified.to_string(),
        });
    }
    let mut inputs = decl.inputs.clone();
    inputs.insert(
        SCRIPT_PATH_PROPERTY.to_string(),
        Value::String(decl.implementation.clone()),
    );
    Ok(ResolvedOperation {
        plugin: Some(SCRIPT_PLUGIN_NAME.to_string()),
        operation: SCRIPT_PLUGIN_RUN_TASK.to_string(),
        executor: effective_executor(decl, plugins, SCRIPT_PLUGIN_NAME),
        inputs,
        max_retries: decl.max_retries,
        retry_interval: decl.retry_interval,
    })
}

/// Declared executor, falling back to the bound plugin's.
fn effective_executor(
    decl: &OperationDecl,
    plugins: &Map<String, Value>,
    plugin: &str,
) -> Option<String> {
    decl.executor.clone().or_else(|| {
        plugins
            .get(plugin)
            .and_then(|record| record.get("executor"))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CENTRAL_DEPLOYMENT_AGENT;
    use serde_json::json;

    struct Scripts(&'static [&'static str]);

    impl ResourceResolver for Scripts {
        fn resource_exists(&self, name: &str) -> bool {
            self.0.contains(&name)
        }
    }

    fn plugins(raw: Value) -> Map<String, Value> {
        match raw {
            Value::Object(map) => map,
            other => panic!("expected mapping, got {other}"),
        }
    }

    fn decl(implementation: &str) -> OperationDecl {
        OperationDecl {
            implementation: implementation.to_string(),
            ..OperationDecl::default()
        }
    }

    #[test]
    fn test_prefix_match_binds_plugin_and_task() {
        let plugins = plugins(json!({
            "pkg": { "executor": CENTRAL_DEPLOYMENT_AGENT }
        }));
        let resolved = resolve_operation(
            "lifecycle.create",
            &decl("pkg.tasks.create"),
            &plugins,
            &NoScripts,
        )
        .unwrap();
        assert_eq!(resolved.plugin.as_deref(), Some("pkg"));
        assert_eq!(resolved.operation, "tasks.create");
        assert_eq!(resolved.executor.as_deref(), Some(CENTRAL_DEPLOYMENT_AGENT));
    }

    struct NoScripts;

    impl ResourceResolver for NoScripts {
        fn resource_exists(&self, _name: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_full_name_equality_is_not_a_match() {
        // "pkg" alone carries no task path; only "pkg." prefixes bind.
        let plugins = plugins(json!({ "pkg": { "executor": CENTRAL_DEPLOYMENT_AGENT } }));
        let err = resolve_operation("lifecycle.create", &decl("pkg"), &plugins, &NoScripts)
            .unwrap_err();
        assert_eq!(err.code(), 10);
    }

    #[test]
    fn test_bare_dot_suffix_binds_with_empty_task() {
        let plugins = plugins(json!({ "pkg": { "executor": CENTRAL_DEPLOYMENT_AGENT } }));
        let resolved =
            resolve_operation("lifecycle.create", &decl("pkg."), &plugins, &NoScripts).unwrap();
        assert_eq!(resolved.plugin.as_deref(), Some("pkg"));
        assert_eq!(resolved.operation, "");
    }

    #[test]
    fn test_ambiguous_prefixes() {
        let plugins = plugins(json!({
            "pkg": { "executor": CENTRAL_DEPLOYMENT_AGENT },
            "pkg.tasks": { "executor": CENTRAL_DEPLOYMENT_AGENT }
        }));
        let err = resolve_operation(
            "lifecycle.create",
            &decl("pkg.tasks.create"),
            &plugins,
            &NoScripts,
        )
        .unwrap_err();
        assert_eq!(err.code(), 91);
        assert!(err.to_string().contains("pkg"));
    }

    #[test]
    fn test_script_synthesis() {
        let plugins = plugins(json!({
            "script": { "executor": CENTRAL_DEPLOYMENT_AGENT }
        }));
        let resolved = resolve_operation(
            "lifecycle.start",
            &decl("scripts/start.sh"),
            &plugins,
            &Scripts(&["scripts/start.sh"]),
        )
        .unwrap();
        assert_eq!(resolved.plugin.as_deref(), Some("script"));
        assert_eq!(resolved.operation, SCRIPT_PLUGIN_RUN_TASK);
        assert_eq!(resolved.inputs["script_path"], json!("scripts/start.sh"));
    }

    #[test]
    fn test_script_without_script_plugin() {
        let plugins = plugins(json!({}));
        let err = resolve_operation(
            "lifecycle.start",
            &decl("scripts/start.sh"),
            &plugins,
            &Scripts(&["scripts/start.sh"]),
        )
        .unwrap_err();
        assert_eq!(err.code(), 61);
    }

    #[test]
    fn test_reserved_script_path_input() {
        let plugins = plugins(json!({
            "script": { "executor": CENTRAL_DEPLOYMENT_AGENT }
        }));
        let mut declared = decl("scripts/start.sh");
        declared
            .inputs
            .insert("script_path".to_string(), json!("elsewhere.sh"));
        let err = resolve_operation(
            "lifecycle.start",
            &declared,
            &plugins,
            &Scripts(&["scripts/start.sh"]),
        )
        .unwrap_err();
        assert_eq!(err.code(), 60);
    }

    #[test]
    fn test_unmapped_declaration_stays_unbound() {
        let resolved =
            resolve_operation("lifecycle.create", &decl(""), &plugins(json!({})), &NoScripts)
                .unwrap();
        assert_eq!(resolved.plugin, None);
        assert_eq!(resolved.operation, "");
    }
}
