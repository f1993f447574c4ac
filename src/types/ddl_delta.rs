use serde::{Deserialize, Serialize};

use crate::types::{DiffRow, DiffStatus, ObjectType};

/// Rendered DDL for one object pair plus the forward fix that turns the
/// target into the source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlDelta {
    pub source_ddl: String,
    pub target_ddl: String,
    pub diff_ddl: String,
}

impl DdlDelta {
    pub fn has_changes(&self) -> bool {
        !self.diff_ddl.trim().is_empty()
    }
}

/// Arguments of a per-object delta fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaRequest {
    pub object_type: ObjectType,
    pub source_object_id: Option<i64>,
    pub target_object_id: Option<i64>,
    pub status: DiffStatus,
}

impl From<&DiffRow> for DeltaRequest {
    fn from(row: &DiffRow) -> Self {
        Self {
            object_type: row.object_type,
            source_object_id: row.source_object_id,
            target_object_id: row.target_object_id,
            status: row.status,
        }
    }
}
