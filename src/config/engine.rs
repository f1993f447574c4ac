use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    /// JSON catalog read by the catalog engine.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Collapse whitespace before comparing DDL.
    #[serde(default = "default_true")]
    pub ignore_whitespace: bool,

    /// Drop `ALTER ... OWNER TO ...` statements before comparing DDL.
    #[serde(default)]
    pub ignore_owner: bool,

    /// Pause after each object type while comparing. Zero disables it.
    #[serde(default)]
    pub step_delay_ms: u64,
}

impl EngineConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            ignore_whitespace: default_true(),
            ignore_owner: false,
            step_delay_ms: 0,
        }
    }
}

fn default_catalog_path() -> String {
    "./catalog.json".to_string()
}

fn default_true() -> bool {
    true
}
