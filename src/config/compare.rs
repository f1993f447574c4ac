use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    types::{DiffStatus, ResultSet},
    utils::serde::deserialize_statuses,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompareConfig {
    /// Interval between progress queries while a comparison runs.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Statuses visible right after a comparison completes.
    #[serde(
        default = "default_statuses",
        deserialize_with = "deserialize_statuses"
    )]
    pub default_statuses: Vec<DiffStatus>,
}

impl CompareConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn default_filter(&self) -> BTreeSet<DiffStatus> {
        self.default_statuses.iter().copied().collect()
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_statuses: default_statuses(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_statuses() -> Vec<DiffStatus> {
    ResultSet::default_filter().into_iter().collect()
}
