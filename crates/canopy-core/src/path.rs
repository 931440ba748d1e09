//! # Element Paths
//!
//! Dotted root-to-node name chains. Every diagnostic produced by the
//! compiler names the document location it refers to through one of these,
//! so a failure inside a deeply nested property
//! (`node_templates.vm.properties.agent.connection`) can be located without
//! re-parsing the document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root-to-node name chain of an element in the blueprint document tree.
///
/// Segments are the keys under which each element sits in its parent
/// mapping. The root document itself has an empty path and renders as
/// `<blueprint>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementPath(Vec<String>);

impl ElementPath {
    /// The empty path of the document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from an iterator of segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Returns a new path extended with `segment`.
    #[must_use]
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Appends `segment` in place.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// The individual name segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True for the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<blueprint>")
        } else {
            f.write_str(&self.0.join("."))
        }
    }
}
