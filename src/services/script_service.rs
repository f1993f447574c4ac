use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::{
    config::ScriptConfig,
    engine::DiffEngine,
    errors::CompareError,
    services::credential_retry::CredentialRetry,
    session::{CurrentDelta, Session, SessionRegistry},
    types::{DdlDelta, DeltaRequest, ResultRow, RowId, ScriptDraft, ScriptFragment, SessionToken},
    utils::script_template::{render_header, render_script},
};

/// Per-object DDL inspection and script synthesis.
pub struct ScriptService {
    config: ScriptConfig,
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn DiffEngine>,
    retry: CredentialRetry,
}

impl ScriptService {
    pub fn new(
        config: ScriptConfig,
        registry: Arc<SessionRegistry>,
        engine: Arc<dyn DiffEngine>,
        retry: CredentialRetry,
    ) -> Self {
        Self {
            config,
            registry,
            engine,
            retry,
        }
    }

    /// Fetches the DDL delta of one row and makes it the current delta.
    ///
    /// The previous delta is dropped right away. If another `inspect` or a
    /// new comparison starts before the fetch returns, the result is thrown
    /// away and [`CompareError::Superseded`] is returned.
    pub async fn inspect(&self, token: SessionToken, row_id: RowId) -> Result<DdlDelta, CompareError> {
        let session = self.registry.get(token).await?;

        let (request, seq) = {
            let mut state = session.state.lock().await;
            let row = state.results.get(row_id).ok_or_else(|| {
                CompareError::Validation(format!("row {} is not in the current result set", row_id))
            })?;
            let request = DeltaRequest::from(&row.row);

            state.inspect_seq += 1;
            state.current_delta = None;
            (request, state.inspect_seq)
        };

        debug!(%token, %row_id, seq, "Fetching DDL delta");
        let delta = self.fetch_delta(token, request).await?;

        let mut state = session.state.lock().await;
        if state.inspect_seq != seq {
            debug!(%token, %row_id, seq, current = state.inspect_seq, "Discarding superseded delta");
            return Err(CompareError::Superseded);
        }

        state.current_delta = Some(CurrentDelta {
            row_id,
            delta: delta.clone(),
        });
        Ok(delta)
    }

    pub async fn current_delta(&self, token: SessionToken) -> Result<Option<CurrentDelta>, CompareError> {
        self.registry
            .with_state(token, |state| state.current_delta.clone())
            .await
    }

    /// Builds a script from the selected rows, in selection order.
    ///
    /// Deltas are fetched concurrently, bounded by `max_parallel_fetches`.
    /// Rows without changes contribute no fragment. Session state is never
    /// modified.
    pub async fn generate_for_selection(&self, token: SessionToken) -> Result<ScriptDraft, CompareError> {
        let session = self.registry.get(token).await?;

        let rows: Vec<ResultRow> = {
            let state = session.state.lock().await;
            state.results.selected_rows().into_iter().cloned().collect()
        };
        if rows.is_empty() {
            return Err(CompareError::EmptySelection);
        }

        let deltas = self.fetch_all(token, &rows).await?;

        let fragments: Vec<ScriptFragment> = rows
            .into_iter()
            .zip(deltas)
            .filter(|(_, delta)| delta.has_changes())
            .map(|(row, delta)| ScriptFragment {
                row_id: row.id,
                object_type: row.row.object_type,
                label: row.row.label,
                sql: delta.diff_ddl.trim_end().to_string(),
            })
            .collect();

        let draft = self.render(&session, fragments)?;
        info!(%token, fragments = draft.fragments.len(), "Script generated for selection");
        Ok(draft)
    }

    /// Wraps the current delta into a script.
    pub async fn generate_for_inspection(&self, token: SessionToken) -> Result<ScriptDraft, CompareError> {
        let session = self.registry.get(token).await?;

        let (current, row) = {
            let state = session.state.lock().await;
            let current = state
                .current_delta
                .clone()
                .ok_or(CompareError::EmptySelection)?;
            let row = state.results.get(current.row_id).cloned();
            (current, row)
        };

        let mut fragments = Vec::new();
        if current.delta.has_changes() {
            let (object_type, label) = row
                .map(|r| (r.row.object_type, r.row.label))
                .ok_or_else(|| {
                    CompareError::Validation(format!(
                        "row {} is not in the current result set",
                        current.row_id
                    ))
                })?;
            fragments.push(ScriptFragment {
                row_id: current.row_id,
                object_type,
                label,
                sql: current.delta.diff_ddl.trim_end().to_string(),
            });
        }

        let draft = self.render(&session, fragments)?;
        info!(%token, row_id = %current.row_id, "Script generated for inspected row");
        Ok(draft)
    }

    async fn fetch_delta(&self, token: SessionToken, request: DeltaRequest) -> Result<DdlDelta, CompareError> {
        fetch_delta(self.retry.clone(), self.engine.clone(), token, request).await
    }

    /// Fetches the delta of every row concurrently. The result is indexed
    /// like `rows`, whatever order the fetches complete in.
    async fn fetch_all(&self, token: SessionToken, rows: &[ResultRow]) -> Result<Vec<DdlDelta>, CompareError> {
        let permits = Arc::new(Semaphore::new(self.config.parallelism()));
        let mut fetches = JoinSet::new();

        for (index, row) in rows.iter().enumerate() {
            let permits = permits.clone();
            let retry = self.retry.clone();
            let engine = self.engine.clone();
            let request = DeltaRequest::from(&row.row);

            fetches.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| CompareError::Engine(e.to_string()))?;
                let delta = fetch_delta(retry, engine, token, request).await?;
                Ok::<_, CompareError>((index, delta))
            });
        }

        let mut slots: Vec<Option<DdlDelta>> = vec![None; rows.len()];
        while let Some(joined) = fetches.join_next().await {
            let (index, delta) = joined
                .map_err(|e| CompareError::Engine(format!("delta fetch task failed: {}", e)))??;
            slots[index] = Some(delta);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, delta)| {
                delta.ok_or_else(|| CompareError::Engine(format!("no delta fetched for row {}", rows[index].id)))
            })
            .collect()
    }

    fn render(&self, session: &Session, fragments: Vec<ScriptFragment>) -> Result<ScriptDraft, CompareError> {
        let header = render_header(
            &session.source,
            &session.target,
            self.config.header_note.as_deref(),
        )
        .map_err(|e| CompareError::Render(format!("{:#}", e)))?;

        let text = render_script(&header, &fragments)
            .map_err(|e| CompareError::Render(format!("{:#}", e)))?;

        Ok(ScriptDraft {
            header,
            fragments,
            text,
        })
    }
}

async fn fetch_delta(
    retry: CredentialRetry,
    engine: Arc<dyn DiffEngine>,
    token: SessionToken,
    request: DeltaRequest,
) -> Result<DdlDelta, CompareError> {
    retry
        .run(move || {
            let engine = engine.clone();
            let request = request.clone();
            async move { engine.get_ddl_delta(token, &request).await }
        })
        .await
}
