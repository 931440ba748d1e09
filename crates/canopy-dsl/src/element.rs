//! # Element Tree
//!
//! A blueprint document is compiled through an arena of elements built by
//! recursive descent over the schema declarations in [`crate::schema`].
//! Every declared field gets an element even when absent from the document
//! (with no raw value), so later stages can address sections uniformly.
//! Gross shape violations — unknown keys, wrong native types, missing
//! required fields — are rejected here with the dotted path of the offender.

use canopy_core::{kind_name, DslParsingError, ElementPath};
use serde_json::Value;

use crate::schema::{ElementKind, SchemaDecl};

/// Arena handle of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

/// Evaluation lifecycle of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    /// Not yet touched by either pass.
    Unvisited,
    /// Validation in progress.
    Validating,
    /// Validation succeeded.
    Validated,
    /// Parsing in progress.
    Parsing,
    /// Parsing succeeded; `computed` is set.
    Parsed,
    /// Either pass failed; evaluation aborts.
    Failed,
}

/// One node of the document tree.
#[derive(Debug)]
pub struct Element {
    /// Own arena handle.
    pub id: ElementId,
    /// Schema kind.
    pub kind: ElementKind,
    /// Key (or list index) under which this element sits in its parent.
    pub name: String,
    /// Raw document value; `None` for declared-but-absent fields.
    pub raw: Option<Value>,
    /// Parent handle; `None` for the root.
    pub parent: Option<ElementId>,
    /// Children in document order.
    pub children: Vec<ElementId>,
    /// Evaluation lifecycle state.
    pub state: EvalState,
    /// Parse result, set once the element reaches `Parsed`.
    pub computed: Option<Value>,
}

impl Element {
    /// Raw value treated as present. JSON `null` counts as absent.
    pub fn raw_value(&self) -> Option<&Value> {
        match &self.raw {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }
}

/// Arena of all elements of one document, root first.
#[derive(Debug)]
pub struct ElementArena {
    elements: Vec<Element>,
}

impl ElementArena {
    /// Build the element tree for `document` under the root blueprint
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns a format error naming the dotted path of the first shape
    /// violation encountered.
    pub fn build(document: &Value) -> Result<Self, DslParsingError> {
        let mut arena = Self {
            elements: Vec::new(),
        };
        arena.build_node(
            ElementKind::Blueprint,
            String::new(),
            Some(document),
            None,
            &ElementPath::root(),
        )?;
        tracing::debug!(elements = arena.elements.len(), "element tree built");
        Ok(arena)
    }

    /// The root element's handle.
    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    /// Immutable access by handle.
    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    /// Number of elements in the arena.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the arena holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All handles in creation (document) order.
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        (0..self.elements.len()).map(ElementId)
    }

    /// Dotted root-to-element path.
    pub fn path(&self, id: ElementId) -> ElementPath {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(cursor) = current {
            let element = self.get(cursor);
            if element.parent.is_some() {
                segments.push(element.name.clone());
            }
            current = element.parent;
        }
        segments.reverse();
        ElementPath::from_segments(segments)
    }

    /// The nearest ancestor of the given kind, excluding the element
    /// itself.
    pub fn ancestor(&self, id: ElementId, kind: ElementKind) -> Option<ElementId> {
        let mut current = self.get(id).parent;
        while let Some(cursor) = current {
            if self.get(cursor).kind == kind {
                return Some(cursor);
            }
            current = self.get(cursor).parent;
        }
        None
    }

    /// All elements of a kind, document order.
    pub fn find_all(&self, kind: ElementKind) -> Vec<ElementId> {
        self.ids().filter(|id| self.get(*id).kind == kind).collect()
    }

    /// The unique element of a kind, when exactly one exists.
    pub fn find_unique(&self, kind: ElementKind) -> Option<ElementId> {
        let mut found = self.ids().filter(|id| self.get(*id).kind == kind);
        let first = found.next()?;
        found.next().is_none().then_some(first)
    }

    /// Child of `id` with the given name.
    pub fn child_named(&self, id: ElementId, name: &str) -> Option<ElementId> {
        self.get(id)
            .children
            .iter()
            .copied()
            .find(|child| self.get(*child).name == name)
    }

    /// Parse result of the named child, `Null` when absent or unparsed.
    pub fn child_computed(&self, id: ElementId, name: &str) -> Value {
        self.child_named(id, name)
            .and_then(|child| self.get(child).computed.clone())
            .unwrap_or(Value::Null)
    }

    /// Update the lifecycle state of an element.
    pub fn set_state(&mut self, id: ElementId, state: EvalState) {
        self.elements[id.0].state = state;
    }

    /// Store the parse result of an element.
    pub fn set_computed(&mut self, id: ElementId, computed: Value) {
        self.elements[id.0].computed = Some(computed);
    }

    fn build_node(
        &mut self,
        kind: ElementKind,
        name: String,
        raw: Option<&Value>,
        parent: Option<ElementId>,
        path: &ElementPath,
    ) -> Result<ElementId, DslParsingError> {
        let id = ElementId(self.elements.len());
        self.elements.push(Element {
            id,
            kind,
            name,
            raw: raw.cloned(),
            parent,
            children: Vec::new(),
            state: EvalState::Unvisited,
            computed: None,
        });
        // JSON null is treated as an absent value throughout.
        let present = match raw {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        };
        if let Some(value) = present {
            self.build_children(id, kind.schema(), value, path)?;
        }
        Ok(id)
    }

    fn build_children(
        &mut self,
        id: ElementId,
        decl: SchemaDecl,
        raw: &Value,
        path: &ElementPath,
    ) -> Result<(), DslParsingError> {
        match decl {
            SchemaDecl::Leaf(shapes) => {
                if !shapes.iter().any(|shape| shape.matches(raw)) {
                    let expected: Vec<_> =
                        shapes.iter().map(|shape| shape.describe()).collect();
                    return Err(DslParsingError::Format {
                        path: path.clone(),
                        message: format!(
                            "expected {} but got {}",
                            expected.join(" or "),
                            kind_name(raw)
                        ),
                    });
                }
                Ok(())
            }
            SchemaDecl::Fields(fields) => {
                let Some(mapping) = raw.as_object() else {
                    return Err(DslParsingError::Format {
                        path: path.clone(),
                        message: format!("expected mapping but got {}", kind_name(raw)),
                    });
                };
                for key in mapping.keys() {
                    if !fields.iter().any(|field| field.name == key) {
                        return Err(DslParsingError::Format {
                            path: path.clone(),
                            message: format!("unknown key '{key}'"),
                        });
                    }
                }
                for field in fields {
                    let value = mapping.get(field.name);
                    let absent = matches!(value, Some(Value::Null) | None);
                    if field.required && absent {
                        return Err(DslParsingError::Format {
                            path: path.clone(),
                            message: format!("missing required key '{}'", field.name),
                        });
                    }
                    let child = self.build_node(
                        field.kind,
                        field.name.to_string(),
                        value,
                        Some(id),
                        &path.join(field.name),
                    )?;
                    self.elements[id.0].children.push(child);
                }
                Ok(())
            }
            SchemaDecl::Map(child_kind) => {
                let Some(mapping) = raw.as_object() else {
                    return Err(DslParsingError::Format {
                        path: path.clone(),
                        message: format!("expected mapping but got {}", kind_name(raw)),
                    });
                };
                for (key, value) in mapping {
                    let child = self.build_node(
                        child_kind,
                        key.clone(),
                        Some(value),
                        Some(id),
                        &path.join(key.clone()),
                    )?;
                    self.elements[id.0].children.push(child);
                }
                Ok(())
            }
            SchemaDecl::List(child_kind) => {
                let Some(items) = raw.as_array() else {
                    return Err(DslParsingError::Format {
                        path: path.clone(),
                        message: format!("expected list but got {}", kind_name(raw)),
                    });
                };
                for (index, value) in items.iter().enumerate() {
                    let child = self.build_node(
                        child_kind,
                        index.to_string(),
                        Some(value),
                        Some(id),
                        &path.join(index.to_string()),
                    )?;
                    self.elements[id.0].children.push(child);
                }
                Ok(())
            }
            SchemaDecl::Alternatives(alternatives) => {
                for alternative in alternatives {
                    if alternative_matches(alternative, raw) {
                        return self.build_children(id, alternative.clone(), raw, path);
                    }
                }
                Err(DslParsingError::Format {
                    path: path.clone(),
                    message: format!(
                        "value of kind {} matches no accepted shape",
                        kind_name(raw)
                    ),
                })
            }
        }
    }
}

/// Structural pre-check deciding which alternative a raw value commits to.
fn alternative_matches(decl: &SchemaDecl, raw: &Value) -> bool {
    match decl {
        SchemaDecl::Leaf(shapes) => shapes.iter().any(|shape| shape.matches(raw)),
        SchemaDecl::Fields(_) | SchemaDecl::Map(_) => raw.is_object(),
        SchemaDecl::List(_) => raw.is_array(),
        // Nested alternatives are not declared anywhere in the schema.
        SchemaDecl::Alternatives(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builds_declared_but_absent_fields() {
        let arena = ElementArena::build(&json!({ "node_templates": {} })).unwrap();
        let root = arena.root();
        // Every blueprint field exists as a child even when absent.
        let plugins = arena.child_named(root, "plugins").unwrap();
        assert!(arena.get(plugins).raw_value().is_none());
        let templates = arena.child_named(root, "node_templates").unwrap();
        assert!(arena.get(templates).raw_value().is_some());
    }

    #[test]
    fn test_unknown_top_level_key_is_format_error() {
        let err = ElementArena::build(&json!({ "node_template": {} })).unwrap_err();
        assert_eq!(err.code(), 1);
        assert!(err.to_string().contains("node_template"));
    }

    #[test]
    fn test_missing_required_key_names_path() {
        let document = json!({ "node_templates": { "vm": { "properties": {} } } });
        let err = ElementArena::build(&document).unwrap_err();
        assert_eq!(err.code(), 1);
        assert!(err.to_string().contains("node_templates.vm"));
        assert!(err.to_string().contains("'type'"));
    }

    #[test]
    fn test_wrong_native_type_names_path() {
        let document = json!({ "node_templates": { "vm": { "type": 3 } } });
        let err = ElementArena::build(&document).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("node_templates.vm.type"));
    }

    #[test]
    fn test_operation_shorthand_commits_to_string_alternative() {
        let document = json!({
            "node_types": {
                "base": {
                    "interfaces": { "lifecycle": { "create": "pkg.tasks.create" } }
                }
            }
        });
        let arena = ElementArena::build(&document).unwrap();
        let op = arena.find_all(ElementKind::Operation)[0];
        assert!(arena.get(op).children.is_empty());
        assert_eq!(arena.get(op).raw_value(), Some(&json!("pkg.tasks.create")));
    }

    #[test]
    fn test_paths_and_ancestors() {
        let document = json!({
            "node_types": {
                "base": {
                    "interfaces": { "lifecycle": { "create": { "implementation": "p.t" } } }
                }
            }
        });
        let arena = ElementArena::build(&document).unwrap();
        let implementation = arena.find_all(ElementKind::OperationImplementation)[0];
        assert_eq!(
            arena.path(implementation).to_string(),
            "node_types.base.interfaces.lifecycle.create.implementation"
        );
        let node_type = arena.ancestor(implementation, ElementKind::NodeType).unwrap();
        assert_eq!(arena.get(node_type).name, "base");
    }

    #[test]
    fn test_list_children_named_by_index() {
        let arena = ElementArena::build(&json!({ "imports": ["a.yaml", "b.yaml"] })).unwrap();
        let imports = arena.find_unique(ElementKind::Imports).unwrap();
        let names: Vec<_> = arena
            .get(imports)
            .children
            .iter()
            .map(|id| arena.get(*id).name.clone())
            .collect();
        assert_eq!(names, ["0", "1"]);
    }
}
