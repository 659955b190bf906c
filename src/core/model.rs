use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator used by the textual property form `ns :: feature :: value`.
pub const PROPERTY_SEPARATOR: &str = "::";

/// A feature together with its acceptable values, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub name: String,
    pub values: Vec<String>,
}

impl FeatureConfig {
    pub fn new<N, I, V>(name: N, values: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// One concrete `(namespace, feature, value)` selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Property {
    pub namespace: String,
    pub feature: String,
    pub value: String,
}

impl Property {
    pub fn new(
        namespace: impl Into<String>,
        feature: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            feature: feature.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {sep} {} {sep} {}",
            self.namespace,
            self.feature,
            self.value,
            sep = PROPERTY_SEPARATOR
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PropertyParseError {
    #[error("expected `namespace :: feature :: value`, got {found} part(s) in {input:?}")]
    WrongPartCount { input: String, found: usize },
    #[error("empty {part} in property {input:?}")]
    EmptyPart { input: String, part: &'static str },
}

impl FromStr for Property {
    type Err = PropertyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(PROPERTY_SEPARATOR).map(str::trim).collect();
        if parts.len() != 3 {
            return Err(PropertyParseError::WrongPartCount {
                input: s.to_string(),
                found: parts.len(),
            });
        }

        for (part, label) in parts.iter().zip(["namespace", "feature", "value"]) {
            if part.is_empty() {
                return Err(PropertyParseError::EmptyPart {
                    input: s.to_string(),
                    part: label,
                });
            }
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

/// Flag category (`cflags`, `cxxflags`) -> flags implied by a property set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildSetup(pub BTreeMap<String, Vec<String>>);

impl BuildSetup {
    pub const CFLAGS: &'static str = "cflags";
    pub const CXXFLAGS: &'static str = "cxxflags";

    /// Same flags for C and C++.
    pub fn with_flags(flags: Vec<String>) -> Self {
        let mut setup = BTreeMap::new();
        setup.insert(Self::CFLAGS.to_string(), flags.clone());
        setup.insert(Self::CXXFLAGS.to_string(), flags);
        Self(setup)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }
}
