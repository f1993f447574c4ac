pub mod compare_service;
pub mod credential_retry;
pub mod script_service;
pub mod session_service;

use std::sync::Arc;

pub use compare_service::{CompareService, CompareSummary};
pub use credential_retry::{CredentialProvider, CredentialRetry, NoCredentials, StaticCredentials};
pub use script_service::ScriptService;
pub use session_service::SessionService;

use crate::{config::Settings, engine::DiffEngine, session::SessionRegistry};

/// The orchestrator's services, sharing one session registry and one engine.
pub struct AppServices {
    pub session_service: SessionService,
    pub compare_service: CompareService,
    pub script_service: ScriptService,
}

impl AppServices {
    pub fn new(
        settings: &Settings,
        engine: Arc<dyn DiffEngine>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let retry = CredentialRetry::new(engine.clone(), credentials);

        Self {
            session_service: SessionService::new(
                settings.compare.clone(),
                registry.clone(),
                engine.clone(),
                retry.clone(),
            ),
            compare_service: CompareService::new(
                settings.compare.clone(),
                registry.clone(),
                engine.clone(),
                retry.clone(),
            ),
            script_service: ScriptService::new(settings.script.clone(), registry, engine, retry),
        }
    }
}
