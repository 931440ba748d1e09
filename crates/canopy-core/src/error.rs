//! # Parsing Error Hierarchy
//!
//! Every failure mode of blueprint compilation is a variant of
//! [`DslParsingError`]. Variants split into two families:
//!
//! - **Format errors** (code 1): the document shape itself is wrong — an
//!   unknown key, a value of the wrong native type, a duplicate list entry.
//!   These are detected locally during tree building and always name the
//!   dotted path of the offending element.
//! - **Logic errors** (all other codes): the document is well-shaped but
//!   semantically invalid — an unknown type name, a derivation cycle, an
//!   ambiguous plugin mapping.
//!
//! The numeric codes are a stable contract: callers branch on
//! [`DslParsingError::code`] rather than on variant identity, so codes are
//! never renumbered.

use crate::path::ElementPath;
use thiserror::Error;

/// A blueprint compilation failure.
///
/// The first error encountered aborts the pass; there is no error recovery
/// or multi-error accumulation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DslParsingError {
    /// The raw YAML text could not be loaded at all.
    #[error("invalid YAML: {message}")]
    InvalidYaml {
        /// Loader diagnostic.
        message: String,
    },

    /// Document shape violation: unknown key, wrong native type, duplicate
    /// list entry, or a value that matches none of the declared
    /// alternatives.
    #[error("invalid blueprint format at '{path}': {message}")]
    Format {
        /// Dotted location of the offending element.
        path: ElementPath,
        /// What was wrong with the shape.
        message: String,
    },

    /// The `definitions_version` string is unparseable or names a revision
    /// this compiler does not understand.
    #[error("unsupported definitions version '{raw}'")]
    UnsupportedVersion {
        /// The raw version string as written.
        raw: String,
    },

    /// A feature was used that the declared DSL revision does not include.
    #[error("'{feature}' at '{path}' requires definitions version {required} or later (blueprint declares {declared})")]
    VersionMismatch {
        /// Dotted location of the gated element.
        path: ElementPath,
        /// The gated field or construct.
        feature: String,
        /// Revision that introduced the feature, rendered.
        required: String,
        /// Revision the blueprint declared, rendered.
        declared: String,
    },

    /// A declared property type or `derived_from` target names a type that
    /// is neither primitive nor declared in the document.
    #[error("type '{type_name}' referenced at '{path}' is not defined")]
    UnknownType {
        /// Dotted location of the reference.
        path: ElementPath,
        /// The unresolvable type name.
        type_name: String,
    },

    /// A node template's `type` names a node type that does not exist.
    #[error("node template '{template}' declares undefined node type '{type_name}'")]
    UnknownNodeType {
        /// The template id.
        template: String,
        /// The missing node type name.
        type_name: String,
    },

    /// A user type shadows one of the primitive type names.
    #[error("type name '{type_name}' at '{path}' shadows a primitive type")]
    InvalidTypeName {
        /// Dotted location of the declaration.
        path: ElementPath,
        /// The offending name.
        type_name: String,
    },

    /// An instance mapping supplies a property the schema does not declare.
    #[error("'{property}' at '{path}' is not declared in the schema")]
    UndefinedProperty {
        /// Dotted location including the property name.
        path: ElementPath,
        /// The undeclared property name.
        property: String,
    },

    /// A schema property with no default received no instance value.
    #[error("required property '{property}' at '{path}' was not assigned a value and has no default")]
    MissingProperty {
        /// Dotted location including the property name.
        path: ElementPath,
        /// The unassigned property name.
        property: String,
    },

    /// An instance value does not conform to its declared property type.
    #[error("property '{path}' expected type '{expected}' but got '{actual}'")]
    TypeMismatch {
        /// Dotted location of the mismatching value.
        path: ElementPath,
        /// The declared type name.
        expected: String,
        /// The native kind of the supplied value.
        actual: String,
    },

    /// A cycle among type derivations or default-bearing property
    /// references.
    #[error("circular type reference: {}", names.join(" -> "))]
    Cycle {
        /// The ordered cycle, first name repeated at the end.
        names: Vec<String>,
    },

    /// More than one declared plugin name is a dotted prefix of the
    /// operation implementation.
    #[error("operation '{operation}' implementation '{implementation}' matches multiple plugins: {}", candidates.join(", "))]
    AmbiguousPluginMapping {
        /// The qualified operation name.
        operation: String,
        /// The implementation string as written.
        implementation: String,
        /// Every matching plugin name, document order.
        candidates: Vec<String>,
    },

    /// No plugin prefix matched and no script resource by that name exists.
    #[error("operation '{operation}' implementation '{implementation}' matches no plugin and no script resource")]
    UnresolvableOperationMapping {
        /// The qualified operation name.
        operation: String,
        /// The implementation string as written.
        implementation: String,
    },

    /// A script-backed operation declared the reserved `script_path` input
    /// itself.
    #[error("operation '{operation}' declares the reserved input 'script_path'")]
    ReservedScriptPathInput {
        /// The qualified operation name.
        operation: String,
    },

    /// A script resource resolved but the `script` plugin is not declared.
    #[error("operation '{operation}' maps to script '{script}' but the 'script' plugin is not declared")]
    MissingScriptPlugin {
        /// The qualified operation name.
        operation: String,
        /// The resolved script resource name.
        script: String,
    },

    /// An operation executor is not one of the known agent kinds.
    #[error("operation '{operation}' declares illegal executor '{executor}'")]
    IllegalExecutor {
        /// The qualified operation name.
        operation: String,
        /// The offending executor string.
        executor: String,
    },

    /// A node type references a top-level interface that is not declared.
    #[error("node type '{type_name}' references undeclared interface '{interface}'")]
    MissingInterface {
        /// The node type name.
        type_name: String,
        /// The missing interface name.
        interface: String,
    },

    /// A single-arity requirement matched no element.
    #[error("element at '{path}' requires a '{target}' element but none exists")]
    UnresolvedRequirement {
        /// Dotted location of the requiring element.
        path: ElementPath,
        /// Human name of the required element kind.
        target: String,
    },

    /// A single-arity requirement matched more than one element.
    #[error("element at '{path}' requires exactly one '{target}' element but {count} match")]
    AmbiguousRequirement {
        /// Dotted location of the requiring element.
        path: ElementPath,
        /// Human name of the required element kind.
        target: String,
        /// How many elements matched.
        count: usize,
    },
}

impl DslParsingError {
    /// Stable numeric code of this failure.
    ///
    /// Codes are part of the public contract and are never renumbered;
    /// gaps in the sequence are deliberate.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidYaml { .. } => -1,
            Self::Format { .. } | Self::InvalidTypeName { .. } => 1,
            Self::UnknownNodeType { .. } => 7,
            Self::MissingInterface { .. } => 9,
            Self::UnresolvableOperationMapping { .. } => 10,
            Self::IllegalExecutor { .. } => 28,
            Self::UnsupportedVersion { .. } => 29,
            Self::UnknownType { .. } => 39,
            Self::TypeMismatch { .. } => 50,
            Self::ReservedScriptPathInput { .. } => 60,
            Self::MissingScriptPlugin { .. } => 61,
            Self::VersionMismatch { .. } => 81,
            Self::AmbiguousPluginMapping { .. } => 91,
            Self::Cycle { .. } => 100,
            Self::UnresolvedRequirement { .. } => 103,
            Self::AmbiguousRequirement { .. } => 104,
            Self::UndefinedProperty { .. } => 106,
            Self::MissingProperty { .. } => 107,
        }
    }

    /// True for document-shape failures (code 1 family).
    pub fn is_format(&self) -> bool {
        self.code() == 1
    }

    /// The ordered name cycle, when this is a [`Self::Cycle`].
    pub fn cycle_path(&self) -> Option<&[String]> {
        match self {
            Self::Cycle { names } => Some(names),
            _ => None,
        }
    }
}
