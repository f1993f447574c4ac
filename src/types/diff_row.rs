use std::fmt;

use colored::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Schema-level object kinds the diff engine reports.
///
/// Variant order is the display order used when grouping results.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Table,
    View,
    MaterializedView,
    Function,
    Procedure,
    TriggerFunction,
    Sequence,
    Type,
    Domain,
    ForeignTable,
    Collation,
    FtsConfiguration,
    FtsDictionary,
    FtsParser,
    FtsTemplate,
    Aggregate,
    Operator,
}

impl ObjectType {
    /// SQL keyword used in DROP/CREATE statements for this kind.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            ObjectType::Table => "TABLE",
            ObjectType::View => "VIEW",
            ObjectType::MaterializedView => "MATERIALIZED VIEW",
            ObjectType::Function | ObjectType::TriggerFunction => "FUNCTION",
            ObjectType::Procedure => "PROCEDURE",
            ObjectType::Sequence => "SEQUENCE",
            ObjectType::Type => "TYPE",
            ObjectType::Domain => "DOMAIN",
            ObjectType::ForeignTable => "FOREIGN TABLE",
            ObjectType::Collation => "COLLATION",
            ObjectType::FtsConfiguration => "TEXT SEARCH CONFIGURATION",
            ObjectType::FtsDictionary => "TEXT SEARCH DICTIONARY",
            ObjectType::FtsParser => "TEXT SEARCH PARSER",
            ObjectType::FtsTemplate => "TEXT SEARCH TEMPLATE",
            ObjectType::Aggregate => "AGGREGATE",
            ObjectType::Operator => "OPERATOR",
        }
    }

    /// Human readable plural, used for progress phases and group headers.
    pub fn plural_label(&self) -> &'static str {
        match self {
            ObjectType::Table => "Tables",
            ObjectType::View => "Views",
            ObjectType::MaterializedView => "Materialized Views",
            ObjectType::Function => "Functions",
            ObjectType::Procedure => "Procedures",
            ObjectType::TriggerFunction => "Trigger Functions",
            ObjectType::Sequence => "Sequences",
            ObjectType::Type => "Types",
            ObjectType::Domain => "Domains",
            ObjectType::ForeignTable => "Foreign Tables",
            ObjectType::Collation => "Collations",
            ObjectType::FtsConfiguration => "FTS Configurations",
            ObjectType::FtsDictionary => "FTS Dictionaries",
            ObjectType::FtsParser => "FTS Parsers",
            ObjectType::FtsTemplate => "FTS Templates",
            ObjectType::Aggregate => "Aggregates",
            ObjectType::Operator => "Operators",
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DiffStatus {
    Identical,
    Different,
    #[strum(to_string = "source_only", serialize = "source-only")]
    SourceOnly,
    #[strum(to_string = "target_only", serialize = "target-only")]
    TargetOnly,
}

impl DiffStatus {
    pub fn to_colored_string(&self) -> String {
        match self {
            DiffStatus::Identical => "IDENTICAL".bright_black().to_string(),
            DiffStatus::Different => "DIFFERENT".yellow().bold().to_string(),
            DiffStatus::SourceOnly => "SOURCE ONLY".green().bold().to_string(),
            DiffStatus::TargetOnly => "TARGET ONLY".red().bold().to_string(),
        }
    }
}

/// Identity the orchestrator assigns to an ingested row.
///
/// Ids are never reused within a session, so an id kept from an older
/// comparison does not resolve against a newer result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One schema object's comparison outcome, as produced by the diff engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffRow {
    pub object_type: ObjectType,
    pub label: String,
    pub source_object_id: Option<i64>,
    pub target_object_id: Option<i64>,
    pub status: DiffStatus,
    /// Per-type display details. Never consulted for control flow.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl DiffRow {
    pub fn new(
        object_type: ObjectType,
        label: impl Into<String>,
        source_object_id: Option<i64>,
        target_object_id: Option<i64>,
        status: DiffStatus,
    ) -> Self {
        Self {
            object_type,
            label: label.into(),
            source_object_id,
            target_object_id,
            status,
            metadata: serde_json::Value::Null,
        }
    }

    /// Checks that the object ids present match the status.
    pub fn check_ids(&self) -> Result<(), String> {
        let ok = match self.status {
            DiffStatus::SourceOnly => {
                self.source_object_id.is_some() && self.target_object_id.is_none()
            }
            DiffStatus::TargetOnly => {
                self.source_object_id.is_none() && self.target_object_id.is_some()
            }
            DiffStatus::Identical | DiffStatus::Different => {
                self.source_object_id.is_some() && self.target_object_id.is_some()
            }
        };

        if ok {
            Ok(())
        } else {
            Err(format!(
                "{} '{}' has status {} but source id {:?} and target id {:?}",
                self.object_type,
                self.label,
                self.status,
                self.source_object_id,
                self.target_object_id
            ))
        }
    }
}

/// A diff row together with the id it was given on ingestion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRow {
    pub id: RowId,
    #[serde(flatten)]
    pub row: DiffRow,
}
