use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    config::EngineConfig,
    engine::{
        DiffEngine,
        catalog::{Catalog, CatalogObject, CatalogSchema},
        ddl::{NormalizeOptions, ObjectRef, normalize_ddl, render_delta},
    },
    errors::EngineError,
    types::{
        Credentials, DdlDelta, DeltaRequest, DiffRow, DiffStatus, Endpoint, ObjectType, Progress,
        SessionToken,
    },
};

struct SessionContext {
    source: Endpoint,
    target: Endpoint,
    progress: Progress,
}

/// [`DiffEngine`] backed by a JSON catalog of per-schema object DDL.
pub struct CatalogEngine {
    catalog: Catalog,
    options: NormalizeOptions,
    step_delay: Duration,
    connected: Mutex<HashSet<i64>>,
    sessions: Mutex<HashMap<SessionToken, SessionContext>>,
}

impl CatalogEngine {
    pub fn new(catalog: Catalog, options: NormalizeOptions) -> Self {
        Self {
            catalog,
            options,
            step_delay: Duration::ZERO,
            connected: Mutex::new(HashSet::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let catalog = Catalog::load(&config.catalog_path)?;
        info!(
            path = %config.catalog_path,
            servers = catalog.servers.len(),
            "Catalog loaded"
        );

        Ok(Self::new(
            catalog,
            NormalizeOptions {
                ignore_whitespace: config.ignore_whitespace,
                ignore_owner: config.ignore_owner,
            },
        )
        .with_step_delay(config.step_delay()))
    }

    /// Pause between object types during a comparison, so progress can be observed.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Forgets an established connection; the next call will be challenged again.
    pub async fn invalidate(&self, server_id: i64) {
        self.connected.lock().await.remove(&server_id);
    }

    async fn ensure_connected(&self, endpoint: &Endpoint) -> Result<(), EngineError> {
        let server = self
            .catalog
            .server(endpoint.server_id)
            .ok_or_else(|| EngineError::Failure(format!("server {} not found", endpoint.server_id)))?;

        if server.password.is_none() || self.connected.lock().await.contains(&server.id) {
            Ok(())
        } else {
            Err(EngineError::CredentialChallenge(endpoint.clone()))
        }
    }

    fn schema(&self, endpoint: &Endpoint) -> Result<&CatalogSchema, EngineError> {
        self.catalog
            .schema(endpoint)
            .ok_or_else(|| EngineError::Failure(format!("schema {} not found in catalog", endpoint)))
    }

    async fn set_progress(&self, token: SessionToken, progress: Progress) {
        if let Some(ctx) = self.sessions.lock().await.get_mut(&token) {
            ctx.progress = progress;
        }
    }

    fn classify(
        &self,
        source: (&CatalogSchema, &CatalogObject),
        target: (&CatalogSchema, &CatalogObject),
    ) -> DiffStatus {
        let (source_schema, source_obj) = source;
        let (target_schema, target_obj) = target;

        let left = normalize_ddl(&source_obj.ddl, &source_schema.name, self.options);
        let right = normalize_ddl(&target_obj.ddl, &target_schema.name, self.options);

        if left == right {
            DiffStatus::Identical
        } else {
            DiffStatus::Different
        }
    }
}

type Pair<'a> = (Option<&'a CatalogObject>, Option<&'a CatalogObject>);

fn pair_objects<'a>(
    source: &'a CatalogSchema,
    target: &'a CatalogSchema,
) -> BTreeMap<ObjectType, BTreeMap<&'a str, Pair<'a>>> {
    let mut by_type: BTreeMap<ObjectType, BTreeMap<&str, Pair>> = BTreeMap::new();

    for obj in &source.objects {
        by_type
            .entry(obj.object_type)
            .or_default()
            .entry(obj.name.as_str())
            .or_default()
            .0 = Some(obj);
    }
    for obj in &target.objects {
        by_type
            .entry(obj.object_type)
            .or_default()
            .entry(obj.name.as_str())
            .or_default()
            .1 = Some(obj);
    }

    by_type
}

fn pick_metadata(source: Option<&CatalogObject>, target: Option<&CatalogObject>) -> serde_json::Value {
    source
        .map(|o| o.metadata.clone())
        .filter(|m| !m.is_null())
        .or_else(|| target.map(|o| o.metadata.clone()))
        .unwrap_or_default()
}

#[async_trait]
impl DiffEngine for CatalogEngine {
    async fn start_compare(
        &self,
        source: &Endpoint,
        target: &Endpoint,
        token: SessionToken,
    ) -> Result<Vec<DiffRow>, EngineError> {
        self.ensure_connected(source).await?;
        self.ensure_connected(target).await?;

        let source_schema = self.schema(source)?;
        let target_schema = self.schema(target)?;

        self.sessions.lock().await.insert(
            token,
            SessionContext {
                source: source.clone(),
                target: target.clone(),
                progress: Progress::started(),
            },
        );

        let by_type = pair_objects(source_schema, target_schema);
        let total = by_type.len().max(1);
        let mut rows = Vec::new();

        for (step, (object_type, objects)) in by_type.into_iter().enumerate() {
            let percent = (step * 100 / total) as u8;
            self.set_progress(
                token,
                Progress::new(percent, format!("Comparing {}", object_type.plural_label())),
            )
            .await;
            debug!(%token, %object_type, count = objects.len(), "Comparing object type");

            for (name, pair) in objects {
                let row = match pair {
                    (Some(s), Some(t)) => DiffRow {
                        status: self.classify((source_schema, s), (target_schema, t)),
                        ..DiffRow::new(object_type, name, Some(s.oid), Some(t.oid), DiffStatus::Identical)
                    },
                    (Some(s), None) => {
                        DiffRow::new(object_type, name, Some(s.oid), None, DiffStatus::SourceOnly)
                    }
                    (None, Some(t)) => {
                        DiffRow::new(object_type, name, None, Some(t.oid), DiffStatus::TargetOnly)
                    }
                    (None, None) => continue,
                };
                rows.push(DiffRow {
                    metadata: pick_metadata(pair.0, pair.1),
                    ..row
                });
            }

            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        self.set_progress(token, Progress::completed()).await;
        info!(%token, %source, %target, rows = rows.len(), "Catalog comparison finished");

        Ok(rows)
    }

    async fn get_progress(&self, token: SessionToken) -> Result<Progress, EngineError> {
        self.sessions
            .lock()
            .await
            .get(&token)
            .map(|ctx| ctx.progress.clone())
            .ok_or_else(|| EngineError::Failure(format!("no comparison for session {}", token)))
    }

    async fn get_ddl_delta(
        &self,
        token: SessionToken,
        request: &DeltaRequest,
    ) -> Result<DdlDelta, EngineError> {
        let (source, target) = {
            let sessions = self.sessions.lock().await;
            let ctx = sessions.get(&token).ok_or_else(|| {
                EngineError::Failure(format!("no comparison for session {}", token))
            })?;
            (ctx.source.clone(), ctx.target.clone())
        };

        let source_schema = self.schema(&source)?;
        let target_schema = self.schema(&target)?;

        let source_ref = match request.source_object_id {
            Some(oid) => {
                self.ensure_connected(&source).await?;
                let object = source_schema.object(oid).ok_or_else(|| {
                    EngineError::Failure(format!("source object {} not found", oid))
                })?;
                Some(ObjectRef {
                    schema: &source_schema.name,
                    object,
                })
            }
            None => None,
        };

        let target_ref = match request.target_object_id {
            Some(oid) => {
                self.ensure_connected(&target).await?;
                let object = target_schema.object(oid).ok_or_else(|| {
                    EngineError::Failure(format!("target object {} not found", oid))
                })?;
                Some(ObjectRef {
                    schema: &target_schema.name,
                    object,
                })
            }
            None => None,
        };

        render_delta(
            request.object_type,
            request.status,
            &target_schema.name,
            source_ref,
            target_ref,
        )
        .map_err(EngineError::Failure)
    }

    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: Option<&Credentials>,
    ) -> Result<(), EngineError> {
        let server = self
            .catalog
            .server(endpoint.server_id)
            .ok_or_else(|| EngineError::Failure(format!("server {} not found", endpoint.server_id)))?;

        match (&server.password, credentials) {
            (None, _) => {}
            (Some(_), None) => return Err(EngineError::CredentialChallenge(endpoint.clone())),
            (Some(expected), Some(given)) if *expected == given.password => {}
            (Some(_), Some(_)) => {
                return Err(EngineError::Authentication {
                    endpoint: endpoint.clone(),
                    reason: format!("password authentication failed for server '{}'", server.name),
                });
            }
        }

        self.connected.lock().await.insert(server.id);
        debug!(%endpoint, server = %server.name, "Connected");
        Ok(())
    }

    async fn release(&self, token: SessionToken) {
        self.sessions.lock().await.remove(&token);
    }
}
