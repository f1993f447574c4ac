use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::errors::CompareError;

/// One side of a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

/// A fully identified (server, database, schema) triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub server_id: i64,
    pub database_id: i64,
    pub schema_id: i64,
}

impl Endpoint {
    pub fn new(server_id: i64, database_id: i64, schema_id: i64) -> Self {
        Self {
            server_id,
            database_id,
            schema_id,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.server_id, self.database_id, self.schema_id
        )
    }
}

/// Endpoint as supplied by a caller, before shape validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub server_id: Option<i64>,
    pub database_id: Option<i64>,
    pub schema_id: Option<i64>,
}

impl EndpointSpec {
    pub fn new(server_id: i64, database_id: i64, schema_id: i64) -> Self {
        Self {
            server_id: Some(server_id),
            database_id: Some(database_id),
            schema_id: Some(schema_id),
        }
    }

    /// Checks that all three identifiers are present. Connectivity is not checked.
    pub fn validate(&self, side: Side) -> Result<Endpoint, CompareError> {
        let missing: Vec<&str> = [
            ("server", self.server_id),
            ("database", self.database_id),
            ("schema", self.schema_id),
        ]
        .iter()
        .filter(|(_, id)| id.is_none())
        .map(|(name, _)| *name)
        .collect();

        match (self.server_id, self.database_id, self.schema_id) {
            (Some(server_id), Some(database_id), Some(schema_id)) => {
                Ok(Endpoint::new(server_id, database_id, schema_id))
            }
            _ => Err(CompareError::Validation(format!(
                "{} endpoint is missing {} id",
                side,
                missing.join(", ")
            ))),
        }
    }
}

impl std::str::FromStr for EndpointSpec {
    type Err = String;

    /// Parses `server/database/schema`, e.g. `1/5/10`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input.split('/').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!(
                "Invalid endpoint: '{}'. Expected 'SERVER/DATABASE/SCHEMA'",
                input
            ));
        }

        let parse = |value: &str, name: &str| -> Result<Option<i64>, String> {
            if value.is_empty() {
                return Ok(None);
            }
            value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| format!("Invalid {} id '{}' in endpoint '{}'", name, value, input))
        };

        Ok(Self {
            server_id: parse(parts[0], "server")?,
            database_id: parse(parts[1], "database")?,
            schema_id: parse(parts[2], "schema")?,
        })
    }
}
