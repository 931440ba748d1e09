//! # Deployment Plan
//!
//! The compiler's output: every section of the blueprint resolved, merged,
//! and default-elaborated. Node templates come out as an ordered list
//! (document order) so downstream consumers never depend on mapping
//! iteration quirks.

use canopy_core::{DslParsingError, DslVersion, ElementPath};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One resolved node in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    /// Template id from the blueprint.
    pub id: String,
    /// Declared node type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Fully merged and default-elaborated properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Bound operations, indexed by `<interface>.<name>` plus unambiguous
    /// short aliases.
    #[serde(default)]
    pub operations: IndexMap<String, Value>,
    /// Plugins touched by this node's operations.
    #[serde(default)]
    pub plugins: Vec<String>,
}

/// A compiled blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// DSL revision the blueprint declared.
    pub version: DslVersion,
    /// Pre-resolved import names, echoed through.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Reusable interface declarations.
    #[serde(default)]
    pub interfaces: IndexMap<String, Value>,
    /// Plugin declarations.
    #[serde(default)]
    pub plugins: IndexMap<String, Value>,
    /// Resolved data types with elaborated defaults.
    #[serde(default)]
    pub data_types: IndexMap<String, Value>,
    /// Resolved node types with merged schemas and interfaces.
    #[serde(default)]
    pub node_types: IndexMap<String, Value>,
    /// Resolved nodes, document order.
    #[serde(default)]
    pub node_templates: Vec<PlanNode>,
    /// Output declarations.
    #[serde(default)]
    pub outputs: IndexMap<String, Value>,
}

impl Plan {
    /// Assemble a plan from the evaluated root value.
    ///
    /// # Errors
    ///
    /// Format error when the root value is not in the shape the evaluator
    /// produces, which would indicate a bug in a section parse.
    pub fn from_root(root: Value, version: DslVersion) -> Result<Self, DslParsingError> {
        let mut sections = match root {
            Value::Object(sections) => sections,
            Value::Null => Map::new(),
            other => {
                return Err(DslParsingError::Format {
                    path: ElementPath::root(),
                    message: format!("evaluated document is not a mapping: {other}"),
                })
            }
        };
        // Node templates are published name-keyed; the plan wants a list.
        if let Some(Value::Object(templates)) = sections.remove("node_templates") {
            sections.insert(
                "node_templates".to_string(),
                Value::Array(templates.into_iter().map(|(_, node)| node).collect()),
            );
        }
        sections.insert(
            "version".to_string(),
            Value::String(version.as_definitions_string()),
        );
        serde_json::from_value(Value::Object(sections)).map_err(|e| {
            DslParsingError::Format {
                path: ElementPath::root(),
                message: format!("plan assembly failed: {e}"),
            }
        })
    }

    /// Look up a node by template id.
    pub fn get_node(&self, id: &str) -> Option<&PlanNode> {
        self.node_templates.iter().find(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assembles_from_root_sections() {
        let root = json!({
            "imports": ["base.yaml"],
            "node_templates": {
                "vm": {
                    "id": "vm",
                    "type": "base",
                    "properties": { "port": 80 },
                    "operations": {},
                    "plugins": []
                }
            }
        });
        let plan = Plan::from_root(root, DslVersion::V1_1).unwrap();
        assert_eq!(plan.version, DslVersion::V1_1);
        assert_eq!(plan.imports, ["base.yaml"]);
        let vm = plan.get_node("vm").unwrap();
        assert_eq!(vm.type_name, "base");
        assert_eq!(vm.properties["port"], json!(80));
        assert!(plan.get_node("ghost").is_none());
    }

    #[test]
    fn test_empty_root_yields_empty_plan() {
        let plan = Plan::from_root(json!({}), DslVersion::V1_0).unwrap();
        assert!(plan.node_templates.is_empty());
        assert!(plan.outputs.is_empty());
    }

    #[test]
    fn test_serializes_version_as_string() {
        let plan = Plan::from_root(json!({}), DslVersion::V1_2).unwrap();
        let rendered = serde_json::to_value(&plan).unwrap();
        assert_eq!(rendered["version"], json!("canopy_dsl_1_2"));
    }
}
