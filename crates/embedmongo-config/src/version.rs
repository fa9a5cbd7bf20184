//! Server versions and the features they advertise.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::defaults::DEFAULT_VERSION;

/// Optional server behaviour gated on the server version.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Feature {
    /// The server accepts `replSetInitiate` without an explicit member list.
    RsInitiate,
}

impl Feature {
    /// First server version advertising the feature.
    #[must_use]
    pub const fn introduced_in(self) -> ServerVersion {
        match self {
            Self::RsInitiate => ServerVersion::new(3, 6, 0),
        }
    }
}

/// Directive applied to a feature on top of version detection.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FeatureOverride {
    /// Treat the feature as available regardless of the version.
    Force,
    /// Treat the feature as unavailable regardless of the version.
    Deny,
    /// Leave the decision to the version (default behaviour).
    #[default]
    Allow,
}

/// Errors produced when parsing a [`ServerVersion`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// The version did not have three dot-separated components.
    #[error("version '{0}' must have the form major.minor.patch")]
    Shape(String),
    /// A component was not a non-negative integer.
    #[error("version '{version}' has a non-numeric component '{component}'")]
    Component {
        /// Full version text.
        version: String,
        /// Offending component.
        component: String,
    },
}

/// Semantic version of the database server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl ServerVersion {
    /// Builds a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns `true` when this version advertises `feature`.
    #[must_use]
    pub fn advertises(self, feature: Feature) -> bool {
        self >= feature.introduced_in()
    }
}

impl Default for ServerVersion {
    fn default() -> Self {
        DEFAULT_VERSION
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ServerVersion {
    type Err = VersionParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let components = trimmed
            .split('.')
            .map(|component| {
                component
                    .parse::<u32>()
                    .map_err(|_| VersionParseError::Component {
                        version: trimmed.to_owned(),
                        component: component.to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        match components.as_slice() {
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(VersionParseError::Shape(trimmed.to_owned())),
        }
    }
}

impl Serialize for ServerVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServerVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
