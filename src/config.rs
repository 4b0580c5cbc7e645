use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables spec.md leaves as constants (§3, §4.6, §5, §9), loaded exactly
/// like the teacher's `RuleSet::load`/`save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `History` ring capacity `H` (spec.md §3/§4.6).
    pub history_capacity: usize,
    /// How many work-area shrinkage events pass between progress callbacks
    /// (spec.md §5: "every ~20 work-area shrinkage events").
    pub progress_cadence: usize,
    /// Guard rail on the `RemovalQueue` drain loop, grounded on the
    /// teacher's `MAX_ITERATIONS` bail-out in `src/algorithm/fast.rs` and
    /// `src/algorithm/backtracking.rs`.
    pub max_propagation_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 3000,
            progress_cadence: 20,
            max_propagation_iterations: 1_000_000,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&yaml)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}
