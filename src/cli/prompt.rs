use async_trait::async_trait;
use indicatif::ProgressBar;
use inquire::Password;
use tracing::warn;

use crate::{
    engine::Catalog,
    services::CredentialProvider,
    types::{Credentials, Endpoint},
};

/// Asks for a password on the terminal whenever an endpoint is challenged.
pub struct PromptCredentials {
    server_names: Vec<(i64, String)>,
    spinner: Option<ProgressBar>,
}

impl PromptCredentials {
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            server_names: catalog
                .servers
                .iter()
                .map(|s| (s.id, s.name.clone()))
                .collect(),
            spinner: None,
        }
    }

    /// The spinner is suspended while the prompt is shown.
    pub fn with_spinner(mut self, spinner: ProgressBar) -> Self {
        self.spinner = Some(spinner);
        self
    }

    fn server_label(&self, server_id: i64) -> String {
        self.server_names
            .iter()
            .find(|(id, _)| *id == server_id)
            .map(|(_, name)| format!("'{}'", name))
            .unwrap_or_else(|| format!("#{}", server_id))
    }
}

#[async_trait]
impl CredentialProvider for PromptCredentials {
    async fn credentials_for(&self, endpoint: &Endpoint) -> Option<Credentials> {
        let message = format!("Password for server {}:", self.server_label(endpoint.server_id));
        let spinner = self.spinner.clone();

        let answer = tokio::task::spawn_blocking(move || {
            let ask = || Password::new(&message).without_confirmation().prompt();
            match spinner {
                Some(spinner) => spinner.suspend(ask),
                None => ask(),
            }
        })
        .await;

        match answer {
            Ok(Ok(password)) => Some(Credentials::password(password)),
            Ok(Err(err)) => {
                warn!(%endpoint, error = %err, "Password prompt aborted");
                None
            }
            Err(err) => {
                warn!(%endpoint, error = %err, "Password prompt task failed");
                None
            }
        }
    }
}
