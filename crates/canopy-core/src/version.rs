//! # DSL Version Tuple
//!
//! Blueprints declare the DSL revision they are written against through a
//! `definitions_version` string of the form `canopy_dsl_1_2`. The loading
//! collaborator hands the parsed tuple to the compiler, which uses it to
//! gate features that were introduced in later revisions (for example,
//! operation retry settings require 1.1).

use crate::error::DslParsingError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every definitions-version string.
pub const DEFINITIONS_VERSION_PREFIX: &str = "canopy_dsl_";

/// A `(major, minor)` DSL revision, ordered for feature gating.
///
/// Serializes as the canonical definitions string (`canopy_dsl_1_2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DslVersion {
    /// Major revision.
    pub major: u32,
    /// Minor revision.
    pub minor: u32,
}

impl DslVersion {
    /// The first public DSL revision.
    pub const V1_0: DslVersion = DslVersion { major: 1, minor: 0 };
    /// Adds operation retry settings (`max_retries`, `retry_interval`).
    pub const V1_1: DslVersion = DslVersion { major: 1, minor: 1 };
    /// Adds user-declared data types.
    pub const V1_2: DslVersion = DslVersion { major: 1, minor: 2 };

    /// Build a version tuple directly.
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a definitions-version string such as `canopy_dsl_1_2`.
    ///
    /// # Errors
    ///
    /// Returns [`DslParsingError::UnsupportedVersion`] when the string does
    /// not carry the expected prefix or a `major_minor` numeric suffix.
    pub fn parse(raw: &str) -> Result<Self, DslParsingError> {
        let unsupported = || DslParsingError::UnsupportedVersion {
            raw: raw.to_string(),
        };
        let suffix = raw
            .strip_prefix(DEFINITIONS_VERSION_PREFIX)
            .ok_or_else(unsupported)?;
        let (major, minor) = suffix.split_once('_').ok_or_else(unsupported)?;
        let major: u32 = major.parse().map_err(|_| unsupported())?;
        let minor: u32 = minor.parse().map_err(|_| unsupported())?;
        Ok(Self { major, minor })
    }

    /// True when this blueprint revision is at least `required`.
    pub fn supports(self, required: DslVersion) -> bool {
        self >= required
    }

    /// Render back to the canonical definitions-version string.
    pub fn as_definitions_string(self) -> String {
        format!("{DEFINITIONS_VERSION_PREFIX}{}_{}", self.major, self.minor)
    }
}

impl fmt::Display for DslVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DEFINITIONS_VERSION_PREFIX}{}_{}", self.major, self.minor)
    }
}

impl Serialize for DslVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_definitions_string())
    }
}

impl<'de> Deserialize<'de> for DslVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}

impl FromStr for DslVersion {
    type Err = DslParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
