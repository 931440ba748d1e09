//! # Blueprint Schema Declaration
//!
//! The shape of a blueprint document is declared here, not discovered: every
//! kind of element the document tree can contain is an [`ElementKind`], and
//! [`ElementKind::schema`] states what raw value that kind accepts and which
//! child kinds it produces. Tree building (in [`crate::element`]) is a
//! recursive descent over these declarations, so a shape violation is always
//! detected at the exact dotted path where it occurs.

use serde_json::Value;

/// Native value shapes a leaf element can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// JSON/YAML string.
    String,
    /// Whole number.
    Integer,
    /// Any number.
    Float,
    /// Boolean.
    Boolean,
    /// Key-value mapping.
    Mapping,
    /// Sequence.
    List,
}

impl ValueShape {
    /// Structural match of `value` against this shape.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Mapping => value.is_object(),
            Self::List => value.is_array(),
        }
    }

    /// Human name used in format diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
            Self::Mapping => "mapping",
            Self::List => "list",
        }
    }
}

/// One named field of a fixed-key mapping schema.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Key under which the field appears.
    pub name: &'static str,
    /// Kind of the child element built for the field.
    pub kind: ElementKind,
    /// Whether the field must be present.
    pub required: bool,
}

impl FieldDecl {
    const fn required(name: &'static str, kind: ElementKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    const fn optional(name: &'static str, kind: ElementKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// What raw value an element kind accepts and how its children are derived.
///
/// `Alternatives` is ordered: the first declaration whose native shape
/// matches the raw value wins, with no backtracking.
#[derive(Debug, Clone)]
pub enum SchemaDecl {
    /// Raw value of one of the listed shapes; no children.
    Leaf(&'static [ValueShape]),
    /// Fixed-key mapping. A child element is built for every declared
    /// field, present or not; unknown keys are a format error.
    Fields(&'static [FieldDecl]),
    /// Dynamic-key mapping; one child of the given kind per key.
    Map(ElementKind),
    /// Sequence; one child of the given kind per item, named by index.
    List(ElementKind),
    /// Ordered structural alternatives.
    Alternatives(&'static [SchemaDecl]),
}

/// Every kind of element a blueprint document tree can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// The document root.
    Blueprint,
    /// Pinned DSL revision string at the top level.
    DefinitionsVersion,
    /// `imports` list.
    Imports,
    /// One import entry.
    Import,
    /// `interfaces` section.
    Interfaces,
    /// One reusable interface declaration.
    InterfaceDecl,
    /// The `operations` list of an interface declaration.
    InterfaceOperations,
    /// One operation name inside an interface declaration.
    InterfaceOperationName,
    /// `plugins` section.
    Plugins,
    /// One plugin declaration.
    Plugin,
    /// A plugin's `executor` field.
    PluginExecutor,
    /// A plugin's `source` field.
    PluginSource,
    /// A plugin's `install` field.
    PluginInstall,
    /// `data_types` section.
    DataTypes,
    /// One data type definition.
    DataTypeDef,
    /// A type's `properties` mapping (property schemas).
    TypeProperties,
    /// Free-text `description` field.
    Description,
    /// `derived_from` parent type name.
    DerivedFrom,
    /// A data type's `version` field.
    TypeVersion,
    /// `node_types` section.
    NodeTypes,
    /// One node type definition.
    NodeType,
    /// A node type's `interfaces` mapping.
    NodeTypeInterfaces,
    /// One interface inside a node type.
    NodeTypeInterface,
    /// One operation declaration (shorthand string or full mapping).
    Operation,
    /// An operation's `implementation` field.
    OperationImplementation,
    /// An operation's `inputs` mapping.
    OperationInputs,
    /// An operation's `executor` field.
    OperationExecutor,
    /// An operation's `max_retries` field.
    OperationMaxRetries,
    /// An operation's `retry_interval` field.
    OperationRetryInterval,
    /// `node_templates` section.
    NodeTemplates,
    /// One node template.
    NodeTemplate,
    /// A template's `type` field.
    TemplateType,
    /// A template's `properties` mapping (instance values).
    TemplateProperties,
    /// A template's `interfaces` mapping.
    TemplateInterfaces,
    /// One interface inside a node template.
    TemplateInterface,
    /// `outputs` section.
    Outputs,
    /// One output declaration.
    Output,
    /// An output's `value` field.
    OutputValue,
}

const ANY_SHAPE: &[ValueShape] = &[
    ValueShape::String,
    ValueShape::Integer,
    ValueShape::Float,
    ValueShape::Boolean,
    ValueShape::Mapping,
    ValueShape::List,
];

const BLUEPRINT_FIELDS: &[FieldDecl] = &[
    FieldDecl::optional("definitions_version", ElementKind::DefinitionsVersion),
    FieldDecl::optional("imports", ElementKind::Imports),
    FieldDecl::optional("interfaces", ElementKind::Interfaces),
    FieldDecl::optional("plugins", ElementKind::Plugins),
    FieldDecl::optional("data_types", ElementKind::DataTypes),
    FieldDecl::optional("node_types", ElementKind::NodeTypes),
    FieldDecl::optional("node_templates", ElementKind::NodeTemplates),
    FieldDecl::optional("outputs", ElementKind::Outputs),
];

const INTERFACE_DECL_FIELDS: &[FieldDecl] = &[FieldDecl::required(
    "operations",
    ElementKind::InterfaceOperations,
)];

const PLUGIN_FIELDS: &[FieldDecl] = &[
    FieldDecl::required("executor", ElementKind::PluginExecutor),
    FieldDecl::optional("source", ElementKind::PluginSource),
    FieldDecl::optional("install", ElementKind::PluginInstall),
];

const DATA_TYPE_FIELDS: &[FieldDecl] = &[
    FieldDecl::optional("properties", ElementKind::TypeProperties),
    FieldDecl::optional("description", ElementKind::Description),
    FieldDecl::optional("derived_from", ElementKind::DerivedFrom),
    FieldDecl::optional("version", ElementKind::TypeVersion),
];

const NODE_TYPE_FIELDS: &[FieldDecl] = &[
    FieldDecl::optional("properties", ElementKind::TypeProperties),
    FieldDecl::optional("derived_from", ElementKind::DerivedFrom),
    FieldDecl::optional("interfaces", ElementKind::NodeTypeInterfaces),
];

const OPERATION_FIELDS: &[FieldDecl] = &[
    FieldDecl::optional("implementation", ElementKind::OperationImplementation),
    FieldDecl::optional("inputs", ElementKind::OperationInputs),
    FieldDecl::optional("executor", ElementKind::OperationExecutor),
    FieldDecl::optional("max_retries", ElementKind::OperationMaxRetries),
    FieldDecl::optional("retry_interval", ElementKind::OperationRetryInterval),
];

const OPERATION_ALTERNATIVES: &[SchemaDecl] = &[
    SchemaDecl::Leaf(&[ValueShape::String]),
    SchemaDecl::Fields(OPERATION_FIELDS),
];

const NODE_TEMPLATE_FIELDS: &[FieldDecl] = &[
    FieldDecl::required("type", ElementKind::TemplateType),
    FieldDecl::optional("properties", ElementKind::TemplateProperties),
    FieldDecl::optional("interfaces", ElementKind::TemplateInterfaces),
];

const OUTPUT_FIELDS: &[FieldDecl] = &[
    FieldDecl::optional("description", ElementKind::Description),
    FieldDecl::required("value", ElementKind::OutputValue),
];

impl ElementKind {
    /// The shape declaration for this kind.
    pub fn schema(self) -> SchemaDecl {
        use ElementKind as K;
        use SchemaDecl as S;
        use ValueShape as V;
        match self {
            K::Blueprint => S::Fields(BLUEPRINT_FIELDS),
            K::DefinitionsVersion => S::Leaf(&[V::String]),
            K::Imports => S::List(K::Import),
            K::Import => S::Leaf(&[V::String]),
            K::Interfaces => S::Map(K::InterfaceDecl),
            K::InterfaceDecl => S::Fields(INTERFACE_DECL_FIELDS),
            K::InterfaceOperations => S::List(K::InterfaceOperationName),
            K::InterfaceOperationName => S::Leaf(&[V::String]),
            K::Plugins => S::Map(K::Plugin),
            K::Plugin => S::Fields(PLUGIN_FIELDS),
            K::PluginExecutor => S::Leaf(&[V::String]),
            K::PluginSource => S::Leaf(&[V::String]),
            K::PluginInstall => S::Leaf(&[V::Boolean]),
            K::DataTypes => S::Map(K::DataTypeDef),
            K::DataTypeDef => S::Fields(DATA_TYPE_FIELDS),
            K::TypeProperties => S::Leaf(&[V::Mapping]),
            K::Description => S::Leaf(&[V::String]),
            K::DerivedFrom => S::Leaf(&[V::String]),
            K::TypeVersion => S::Leaf(&[V::String]),
            K::NodeTypes => S::Map(K::NodeType),
            K::NodeType => S::Fields(NODE_TYPE_FIELDS),
            K::NodeTypeInterfaces => S::Map(K::NodeTypeInterface),
            K::NodeTypeInterface => S::Map(K::Operation),
            K::Operation => S::Alternatives(OPERATION_ALTERNATIVES),
            K::OperationImplementation => S::Leaf(&[V::String]),
            K::OperationInputs => S::Leaf(&[V::Mapping]),
            K::OperationExecutor => S::Leaf(&[V::String]),
            K::OperationMaxRetries => S::Leaf(&[V::Integer]),
            K::OperationRetryInterval => S::Leaf(&[V::Integer, V::Float]),
            K::NodeTemplates => S::Map(K::NodeTemplate),
            K::NodeTemplate => S::Fields(NODE_TEMPLATE_FIELDS),
            K::TemplateType => S::Leaf(&[V::String]),
            K::TemplateProperties => S::Leaf(&[V::Mapping]),
            K::TemplateInterfaces => S::Map(K::TemplateInterface),
            K::TemplateInterface => S::Map(K::Operation),
            K::Outputs => S::Map(K::Output),
            K::Output => S::Fields(OUTPUT_FIELDS),
            K::OutputValue => S::Leaf(ANY_SHAPE),
        }
    }

    /// The plan section key this kind's parse result is published under,
    /// for the top-level section kinds only.
    pub fn section_key(self) -> Option<&'static str> {
        match self {
            Self::Imports => Some("imports"),
            Self::Interfaces => Some("interfaces"),
            Self::Plugins => Some("plugins"),
            Self::DataTypes => Some("data_types"),
            Self::NodeTypes => Some("node_types"),
            Self::NodeTemplates => Some("node_templates"),
            Self::Outputs => Some("outputs"),
            _ => None,
        }
    }

    /// Human name used in requirement diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Blueprint => "blueprint",
            Self::DefinitionsVersion => "definitions_version",
            Self::Imports => "imports",
            Self::Import => "import",
            Self::Interfaces => "interfaces",
            Self::InterfaceDecl => "interface",
            Self::InterfaceOperations => "interface operations",
            Self::InterfaceOperationName => "interface operation name",
            Self::Plugins => "plugins",
            Self::Plugin => "plugin",
            Self::PluginExecutor => "plugin executor",
            Self::PluginSource => "plugin source",
            Self::PluginInstall => "plugin install flag",
            Self::DataTypes => "data_types",
            Self::DataTypeDef => "data type",
            Self::TypeProperties => "property schemas",
            Self::Description => "description",
            Self::DerivedFrom => "derived_from",
            Self::TypeVersion => "type version",
            Self::NodeTypes => "node_types",
            Self::NodeType => "node type",
            Self::NodeTypeInterfaces => "node type interfaces",
            Self::NodeTypeInterface => "node type interface",
            Self::Operation => "operation",
            Self::OperationImplementation => "operation implementation",
            Self::OperationInputs => "operation inputs",
            Self::OperationExecutor => "operation executor",
            Self::OperationMaxRetries => "operation max_retries",
            Self::OperationRetryInterval => "operation retry_interval",
            Self::NodeTemplates => "node_templates",
            Self::NodeTemplate => "node template",
            Self::TemplateType => "node template type",
            Self::TemplateProperties => "node template properties",
            Self::TemplateInterfaces => "node template interfaces",
            Self::TemplateInterface => "node template interface",
            Self::Outputs => "outputs",
            Self::Output => "output",
            Self::OutputValue => "output value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shape_matching() {
        assert!(ValueShape::Integer.matches(&json!(3)));
        assert!(!ValueShape::Integer.matches(&json!(3.5)));
        assert!(ValueShape::Float.matches(&json!(3)));
        assert!(ValueShape::Float.matches(&json!(3.5)));
        assert!(ValueShape::Mapping.matches(&json!({})));
        assert!(!ValueShape::Mapping.matches(&json!([])));
    }

    #[test]
    fn test_operation_alternatives_order() {
        // Shorthand string must be the first alternative so a string
        // implementation never reaches the fixed-key branch.
        let SchemaDecl::Alternatives(alts) = ElementKind::Operation.schema() else {
            panic!("operation schema must be alternatives");
        };
        assert!(matches!(alts[0], SchemaDecl::Leaf(_)));
        assert!(matches!(alts[1], SchemaDecl::Fields(_)));
    }

    #[test]
    fn test_blueprint_fields_are_all_optional() {
        let SchemaDecl::Fields(fields) = ElementKind::Blueprint.schema() else {
            panic!("blueprint schema must be fixed-key");
        };
        assert!(fields.iter().all(|f| !f.required));
    }

    #[test]
    fn test_section_keys() {
        assert_eq!(ElementKind::DataTypes.section_key(), Some("data_types"));
        assert_eq!(ElementKind::DataTypeDef.section_key(), None);
        assert_eq!(ElementKind::Blueprint.section_key(), None);
    }
}
