use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BlockName, BlockPos};

/// Block property map (e.g. `facing=north`, `waterlogged=true`).
///
/// Ordered so that hashing and iteration are deterministic.
pub type Properties = BTreeMap<String, String>;

/// Property key marking a cell that also holds water.
pub const WATERLOGGED: &str = "waterlogged";

/// A block type plus its properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    /// Namespaced block name.
    pub name: BlockName,
    /// Explicit properties; registry defaults are merged on lookup.
    #[serde(default)]
    pub properties: Properties,
}

impl BlockState {
    /// State with no explicit properties.
    pub fn new(name: BlockName) -> Self {
        Self {
            name,
            properties: Properties::new(),
        }
    }

    /// Empty cell.
    pub fn air() -> Self {
        Self::new(BlockName::air())
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Properties with `defaults` filled in underneath the explicit values.
    pub fn merged_properties(&self, defaults: &Properties) -> Properties {
        let mut merged = defaults.clone();
        merged.extend(
            self.properties
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        merged
    }
}

/// Whether a property map marks the cell as waterlogged.
pub fn is_waterlogged(properties: &Properties) -> bool {
    properties.get(WATERLOGGED).is_some_and(|v| v == "true")
}

/// A block at a position inside a structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBlock {
    /// Structure-space position.
    pub pos: BlockPos,
    /// Block type and properties.
    pub state: BlockState,
    /// Opaque block-entity payload (sign text, banner patterns, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl PlacedBlock {
    /// Place `state` at `pos` without block-entity data.
    pub fn new(pos: BlockPos, state: BlockState) -> Self {
        Self {
            pos,
            state,
            extra: None,
        }
    }

    /// Attach block-entity data.
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_properties_override_defaults() {
        let state = BlockState::new(BlockName::parse("oak_stairs").unwrap())
            .with_property("facing", "east");
        let mut defaults = Properties::new();
        defaults.insert("facing".into(), "north".into());
        defaults.insert(WATERLOGGED.into(), "false".into());

        let merged = state.merged_properties(&defaults);
        assert_eq!(merged.get("facing").map(String::as_str), Some("east"));
        assert_eq!(merged.get(WATERLOGGED).map(String::as_str), Some("false"));
        assert!(!is_waterlogged(&merged));
    }

    #[test]
    fn waterlogged_requires_literal_true() {
        let mut props = Properties::new();
        assert!(!is_waterlogged(&props));
        props.insert(WATERLOGGED.into(), "TRUE".into());
        assert!(!is_waterlogged(&props));
        props.insert(WATERLOGGED.into(), "true".into());
        assert!(is_waterlogged(&props));
    }
}
