use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    config::CompareConfig,
    engine::DiffEngine,
    errors::CompareError,
    services::credential_retry::CredentialRetry,
    session::{Session, SessionRegistry},
    types::{
        CompareState, Credentials, DiffStatus, Endpoint, EndpointSpec, ResultRow, RowId,
        SessionToken, Side, StatusCounts, TypeGroup,
    },
};

/// Session lifecycle and the result model operations of an open session.
pub struct SessionService {
    config: CompareConfig,
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn DiffEngine>,
    retry: CredentialRetry,
}

impl SessionService {
    pub fn new(
        config: CompareConfig,
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

    /// Opens a session. Endpoints are checked for shape only; nothing connects yet.
    pub async fn open(
        &self,
        source: &EndpointSpec,
        target: &EndpointSpec,
    ) -> Result<SessionToken, CompareError> {
        let source = source.validate(Side::Source)?;
        let target = target.validate(Side::Target)?;

        let session = self
            .registry
            .insert(Session::new(
                source.clone(),
                target.clone(),
                self.config.default_filter(),
            ))
            .await;

        info!(token = %session.token, %source, %target, "Session opened");
        Ok(session.token)
    }

    /// Closes a session, stopping any running comparison and its poller.
    pub async fn close(&self, token: SessionToken) -> Result<(), CompareError> {
        let session = self.registry.remove(token).await?;
        {
            let mut state = session.state.lock().await;
            state.reset(self.config.default_filter());
            state.lifecycle = CompareState::Idle;
        }

        self.engine.release(token).await;
        info!(%token, "Session closed");
        Ok(())
    }

    /// Number of open sessions.
    pub async fn sessions(&self) -> usize {
        self.registry.len().await
    }

    pub async fn endpoints(&self, token: SessionToken) -> Result<(Endpoint, Endpoint), CompareError> {
        let session = self.registry.get(token).await?;
        Ok((session.source.clone(), session.target.clone()))
    }

    /// Connects one side of a session with explicitly supplied credentials.
    #[instrument(skip(self, credentials))]
    pub async fn connect(
        &self,
        token: SessionToken,
        side: Side,
        credentials: &Credentials,
    ) -> Result<(), CompareError> {
        let session = self.registry.get(token).await?;
        let endpoint = match side {
            Side::Source => &session.source,
            Side::Target => &session.target,
        };

        self.retry.connect(endpoint, credentials).await?;
        info!(%token, %side, %endpoint, "Endpoint connected");
        Ok(())
    }

    pub async fn apply_filter(
        &self,
        token: SessionToken,
        statuses: impl IntoIterator<Item = DiffStatus>,
    ) -> Result<(), CompareError> {
        self.registry
            .with_state(token, |state| state.results.apply_filter(statuses))
            .await
    }

    pub async fn filter(&self, token: SessionToken) -> Result<Vec<DiffStatus>, CompareError> {
        self.registry
            .with_state(token, |state| state.results.filter().iter().copied().collect())
            .await
    }

    pub async fn group_by_type(&self, token: SessionToken) -> Result<Vec<TypeGroup>, CompareError> {
        self.registry
            .with_state(token, |state| state.results.group_by_type())
            .await
    }

    pub async fn status_counts(&self, token: SessionToken) -> Result<StatusCounts, CompareError> {
        self.registry
            .with_state(token, |state| state.results.status_counts())
            .await
    }

    pub async fn rows(&self, token: SessionToken) -> Result<Vec<ResultRow>, CompareError> {
        self.registry
            .with_state(token, |state| state.results.rows().to_vec())
            .await
    }

    pub async fn visible_rows(&self, token: SessionToken) -> Result<Vec<ResultRow>, CompareError> {
        self.registry
            .with_state(token, |state| {
                state.results.visible_rows().into_iter().cloned().collect()
            })
            .await
    }

    /// Adds rows to the selection. Unknown ids are ignored.
    pub async fn select(&self, token: SessionToken, ids: &[RowId]) -> Result<usize, CompareError> {
        self.registry
            .with_state(token, |state| state.results.select(ids.iter().copied()))
            .await
    }

    pub async fn deselect(&self, token: SessionToken, ids: &[RowId]) -> Result<usize, CompareError> {
        self.registry
            .with_state(token, |state| state.results.deselect(ids.iter().copied()))
            .await
    }

    /// Selects every visible row, in result order.
    pub async fn select_visible(&self, token: SessionToken) -> Result<usize, CompareError> {
        self.registry
            .with_state(token, |state| state.results.select_visible())
            .await
    }

    pub async fn clear_selection(&self, token: SessionToken) -> Result<(), CompareError> {
        self.registry
            .with_state(token, |state| state.results.clear_selection())
            .await
    }

    /// Selected rows in insertion order.
    pub async fn selection(&self, token: SessionToken) -> Result<Vec<ResultRow>, CompareError> {
        self.registry
            .with_state(token, |state| {
                state.results.selected_rows().into_iter().cloned().collect()
            })
            .await
    }
}
