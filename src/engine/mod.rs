pub mod catalog;
pub mod catalog_engine;
pub mod ddl;

use async_trait::async_trait;

use crate::{
    errors::EngineError,
    types::{Credentials, DdlDelta, DeltaRequest, DiffRow, Endpoint, Progress, SessionToken},
};

pub use catalog::Catalog;
pub use catalog_engine::CatalogEngine;

/// Object introspection and DDL rendering backend driven by the orchestrator.
///
/// Every call is keyed by the session token so one engine can serve many
/// sessions. Any call touching a database may answer with
/// [`EngineError::CredentialChallenge`].
#[async_trait]
pub trait DiffEngine: Send + Sync {
    /// Runs a full comparison and returns the terminal row list.
    async fn start_compare(
        &self,
        source: &Endpoint,
        target: &Endpoint,
        token: SessionToken,
    ) -> Result<Vec<DiffRow>, EngineError>;

    /// Latest progress of the comparison running for `token`.
    async fn get_progress(&self, token: SessionToken) -> Result<Progress, EngineError>;

    async fn get_ddl_delta(
        &self,
        token: SessionToken,
        request: &DeltaRequest,
    ) -> Result<DdlDelta, EngineError>;

    /// Establishes (or re-establishes) the connection behind `endpoint`.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: Option<&Credentials>,
    ) -> Result<(), EngineError>;

    /// Drops engine-side state kept for a closed session.
    async fn release(&self, token: SessionToken);
}
