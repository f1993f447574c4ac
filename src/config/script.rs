use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScriptConfig {
    /// Upper bound on concurrent DDL delta fetches while building a script.
    #[serde(default = "default_max_parallel_fetches")]
    pub max_parallel_fetches: usize,

    /// Extra line appended to the script header.
    #[serde(default)]
    pub header_note: Option<String>,

    /// Directory the CLI writes generated scripts to when `--output-path` is absent.
    #[serde(default)]
    pub output_dir: Option<String>,
}

impl ScriptConfig {
    pub fn parallelism(&self) -> usize {
        self.max_parallel_fetches.max(1)
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_parallel_fetches: default_max_parallel_fetches(),
            header_note: None,
            output_dir: None,
        }
    }
}

fn default_max_parallel_fetches() -> usize {
    4
}
