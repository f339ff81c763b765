//! Namespaced block names.
//!
//! Structures reference blocks by `namespace:path` strings (e.g.
//! `minecraft:oak_planks`). Names that omit the namespace resolve to
//! [`DEFAULT_NAMESPACE`], so `stone` and `minecraft:stone` compare equal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace used when a name omits one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Error returned when parsing an invalid [`BlockName`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid block name {input:?}: {reason}")]
pub struct BlockNameError {
    input: String,
    reason: &'static str,
}

impl BlockNameError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A namespaced block identifier.
///
/// Ordering is lexical by `(namespace, path)` and stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockName {
    namespace: String,
    path: String,
}

impl BlockName {
    /// Parse `namespace:path` or a bare `path`.
    pub fn parse(input: &str) -> Result<Self, BlockNameError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(BlockNameError::new(input, "empty"));
        }

        let (namespace, path) = match trimmed.split_once(':') {
            Some((ns, p)) => (ns.trim(), p.trim()),
            None => (DEFAULT_NAMESPACE, trimmed),
        };

        if namespace.is_empty() {
            return Err(BlockNameError::new(input, "namespace is empty"));
        }
        if !namespace
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.'))
        {
            return Err(BlockNameError::new(
                input,
                "namespace allows a-z0-9_.- only",
            ));
        }
        if path.is_empty() {
            return Err(BlockNameError::new(input, "path is empty"));
        }
        if !path
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/'))
        {
            return Err(BlockNameError::new(input, "path allows a-z0-9_./- only"));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// The name structures use for known-empty cells.
    pub fn air() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            path: "air".to_string(),
        }
    }

    /// Namespace component.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Path component.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this names one of the air variants.
    pub fn is_air(&self) -> bool {
        self.namespace == DEFAULT_NAMESPACE
            && matches!(self.path.as_str(), "air" | "cave_air" | "void_air")
    }
}

impl fmt::Display for BlockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for BlockName {
    type Err = BlockNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for BlockName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespaced_name() {
        let name = BlockName::parse("minecraft:stone").unwrap();
        assert_eq!(name.namespace(), "minecraft");
        assert_eq!(name.path(), "stone");
        assert_eq!(name.to_string(), "minecraft:stone");
    }

    #[test]
    fn bare_path_uses_default_namespace() {
        assert_eq!(
            BlockName::parse("stone").unwrap(),
            BlockName::parse("minecraft:stone").unwrap()
        );
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(BlockName::parse("").is_err());
        assert!(BlockName::parse("   ").is_err());
        assert!(BlockName::parse("minecraft:Stone").is_err());
        assert!(BlockName::parse(":stone").is_err());
        assert!(BlockName::parse("minecraft:").is_err());
    }

    #[test]
    fn air_variants_are_air() {
        assert!(BlockName::air().is_air());
        assert!(BlockName::parse("cave_air").unwrap().is_air());
        assert!(!BlockName::parse("glass").unwrap().is_air());
        assert!(!BlockName::parse("mymod:air").unwrap().is_air());
    }

    #[test]
    fn serde_uses_display_form() {
        let name = BlockName::parse("glass").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"minecraft:glass\"");
        let back: BlockName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
