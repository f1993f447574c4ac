use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::types::{Endpoint, ObjectType};

/// Snapshot of server, database and schema definitions read by the catalog engine.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default)]
    pub servers: Vec<CatalogServer>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatalogServer {
    pub id: i64,
    pub name: String,
    /// Servers with a password only accept connections that present it.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub databases: Vec<CatalogDatabase>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatalogDatabase {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub schemas: Vec<CatalogSchema>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatalogSchema {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub objects: Vec<CatalogObject>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatalogObject {
    pub oid: i64,
    pub object_type: ObjectType,
    pub name: String,
    pub ddl: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;

        Self::from_json(&content).with_context(|| format!("Invalid catalog {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse catalog JSON")
    }

    pub fn server(&self, server_id: i64) -> Option<&CatalogServer> {
        self.servers.iter().find(|s| s.id == server_id)
    }

    pub fn schema(&self, endpoint: &Endpoint) -> Option<&CatalogSchema> {
        self.server(endpoint.server_id)?
            .databases
            .iter()
            .find(|d| d.id == endpoint.database_id)?
            .schemas
            .iter()
            .find(|s| s.id == endpoint.schema_id)
    }
}

impl CatalogSchema {
    pub fn object(&self, oid: i64) -> Option<&CatalogObject> {
        self.objects.iter().find(|o| o.oid == oid)
    }
}
