//! Plugin and secret references with an optional marker.
//!
//! Configuration and plugin definitions name their dependencies and secrets
//! as plain strings, where a trailing `?` marks the reference as optional.
//! The marker is parsed once into a [`Reference`] so nothing downstream has
//! to look at raw strings again.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Suffix marking a dependency or secret as optional.
pub const OPTIONAL_MARKER: char = '?';

/// A named reference to a plugin or secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    name: String,
    optional: bool,
}

impl Reference {
    /// Parse a raw reference, stripping a single trailing [`OPTIONAL_MARKER`].
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix(OPTIONAL_MARKER) {
            Some(name) => Self::optional(name),
            None => Self::required(raw),
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }

    /// The canonical name, without the marker.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "{}{OPTIONAL_MARKER}", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

impl FromStr for Reference {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Reference {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Reference {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
