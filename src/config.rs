//! Highlighter configuration, loadable from JSON

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;
use crate::predicate::AllowList;

/// Tunables for one highlighter feature instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlighterConfig {
    /// Eviction limit: Euclidean horizontal distance from the observer's
    /// chunk, in chunk units
    pub render_distance_chunks: f32,
    /// Maximum chunk scans in flight at once
    pub scan_workers: usize,
    /// Block states to highlight; seeds the feature's initial predicate
    pub allow_list: AllowList,
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        Self {
            render_distance_chunks: 12.0,
            scan_workers: 4,
            allow_list: AllowList::new(),
        }
    }
}

impl HighlighterConfig {
    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
