//! Plugin declarations.

use canopy_core::DslParsingError;
use serde_json::Value;

use crate::constants::{is_executor, EXECUTORS};
use crate::element::Element;
use crate::evaluator::EvalContext;

/// A plugin's executor must be one of the known agent kinds.
pub fn validate_plugin(
    ctx: &EvalContext<'_>,
    element: &Element,
) -> Result<(), DslParsingError> {
    let Some(executor_id) = ctx.arena.child_named(element.id, "executor") else {
        return Ok(());
    };
    let Some(executor) = ctx.arena.get(executor_id).raw_value().and_then(Value::as_str)
    else {
        return Ok(());
    };
    if !is_executor(executor) {
        return Err(DslParsingError::Format {
            path: ctx.arena.path(executor_id),
            message: format!(
                "executor must be one of {} but got '{executor}'",
                EXECUTORS.join(", ")
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use canopy_core::DslVersion;
    use serde_json::json;

    use crate::element::ElementArena;
    use crate::evaluator::{Evaluator, NoResources};

    #[test]
    fn test_plugin_with_unknown_executor() {
        let arena = ElementArena::build(&json!({
            "plugins": { "pkg": { "executor": "local" } }
        }))
        .unwrap();
        let err = Evaluator::new(arena, DslVersion::V1_2, &NoResources)
            .evaluate()
            .unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("plugins.pkg.executor"));
    }

    #[test]
    fn test_plugin_section_echoes_fields() {
        let arena = ElementArena::build(&json!({
            "plugins": {
                "pkg": { "executor": "central_deployment_agent", "install": false }
            }
        }))
        .unwrap();
        let value = Evaluator::new(arena, DslVersion::V1_2, &NoResources)
            .evaluate()
            .unwrap();
        assert_eq!(
            value["plugins"]["pkg"],
            json!({ "executor": "central_deployment_agent", "install": false })
        );
    }
}
