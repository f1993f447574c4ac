use serde::Serialize;

use crate::types::{ObjectType, RowId};

/// One object's forward-fix statements inside a script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScriptFragment {
    pub row_id: RowId,
    pub object_type: ObjectType,
    pub label: String,
    pub sql: String,
}

/// Transaction-wrapped migration script. Derived on demand and never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScriptDraft {
    pub header: String,
    pub fragments: Vec<ScriptFragment>,
    pub text: String,
}

impl ScriptDraft {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
