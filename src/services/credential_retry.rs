use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    engine::DiffEngine,
    errors::{CompareError, EngineError},
    types::{Credentials, Endpoint},
};

/// Source of credentials used to answer a credential challenge.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// `None` means the challenge is handed back to the caller.
    async fn credentials_for(&self, endpoint: &Endpoint) -> Option<Credentials>;
}

/// Never supplies credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn credentials_for(&self, _endpoint: &Endpoint) -> Option<Credentials> {
        None
    }
}

/// Fixed credentials keyed by server id.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    by_server: HashMap<i64, Credentials>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, server_id: i64, credentials: Credentials) -> Self {
        self.by_server.insert(server_id, credentials);
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials_for(&self, endpoint: &Endpoint) -> Option<Credentials> {
        self.by_server.get(&endpoint.server_id).cloned()
    }
}

/// Runs engine operations and answers credential challenges by connecting
/// with provider credentials and replaying the operation.
///
/// Each endpoint is answered at most once per call to [`CredentialRetry::run`];
/// a second challenge for it is reported as an authentication failure.
#[derive(Clone)]
pub struct CredentialRetry {
    engine: Arc<dyn DiffEngine>,
    provider: Arc<dyn CredentialProvider>,
}

impl CredentialRetry {
    pub fn new(engine: Arc<dyn DiffEngine>, provider: Arc<dyn CredentialProvider>) -> Self {
        Self { engine, provider }
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, CompareError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, EngineError>> + Send,
        T: Send,
    {
        let mut challenged: HashSet<Endpoint> = HashSet::new();

        loop {
            let endpoint = match operation().await {
                Ok(value) => return Ok(value),
                Err(EngineError::CredentialChallenge(endpoint)) => endpoint,
                Err(err) => return Err(err.into()),
            };

            if !challenged.insert(endpoint.clone()) {
                warn!(%endpoint, "Endpoint challenged again after reconnect");
                return Err(CompareError::Authentication {
                    endpoint,
                    reason: "credentials were rejected on replay".to_string(),
                });
            }

            warn!(%endpoint, "Credential challenge, requesting credentials");
            let Some(credentials) = self.provider.credentials_for(&endpoint).await else {
                return Err(CompareError::CredentialChallenge(endpoint));
            };

            self.connect(&endpoint, &credentials).await?;
            info!(%endpoint, "Reconnected, replaying operation");
        }
    }

    /// Connects with explicit credentials. Any challenge at this point means
    /// the credentials were not accepted.
    pub async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<(), CompareError> {
        match self.engine.connect(endpoint, Some(credentials)).await {
            Ok(()) => Ok(()),
            Err(EngineError::CredentialChallenge(endpoint)) => Err(CompareError::Authentication {
                endpoint,
                reason: "credentials were not accepted".to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
