use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::{
    config::CompareConfig,
    engine::DiffEngine,
    errors::CompareError,
    services::credential_retry::CredentialRetry,
    session::{Session, SessionRegistry},
    types::{CompareState, DiffRow, Progress, SessionProgress, SessionToken, StatusCounts},
};

/// Outcome of a successful comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompareSummary {
    pub token: SessionToken,
    pub counts: StatusCounts,
    pub total: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Drives comparisons: starts the engine run, polls its progress and
/// installs the terminal result set.
pub struct CompareService {
    config: CompareConfig,
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn DiffEngine>,
    retry: CredentialRetry,
}

impl CompareService {
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

    /// Runs a comparison to completion. Any comparison already running for
    /// the session is canceled first and its caller receives
    /// [`CompareError::Canceled`].
    pub async fn compare(&self, token: SessionToken) -> Result<CompareSummary, CompareError> {
        let session = self.registry.get(token).await?;
        let started_at = Utc::now();

        let (attempt, handle) = {
            let mut state = session.state.lock().await;
            let previous = state.lifecycle.clone();
            let attempt = state.reset(self.config.default_filter());
            state.lifecycle = CompareState::Comparing;
            state.progress = Progress::started();

            if previous == CompareState::Comparing {
                info!(%token, attempt, "Restarting comparison, previous attempt canceled");
            } else {
                info!(%token, attempt, source = %session.source, target = %session.target, "Comparison started");
            }

            let handle = self.spawn_compare(&session);
            let poller = self.spawn_poller(session.clone(), attempt);
            state.track_compare(handle.abort_handle(), poller.abort_handle());

            (attempt, handle)
        };

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_cancelled() => {
                debug!(%token, attempt, "Comparison task aborted");
                return Err(CompareError::Canceled);
            }
            Err(join_err) => Err(CompareError::Engine(format!(
                "comparison task failed: {}",
                join_err
            ))),
        };

        let mut state = session.state.lock().await;
        if state.attempt != attempt {
            debug!(%token, attempt, current = state.attempt, "Discarding result of stale attempt");
            return Err(CompareError::Canceled);
        }
        state.stop_tasks();

        let rows = match outcome.and_then(validate_rows) {
            Ok(rows) => rows,
            Err(err) => {
                error!(%token, attempt, error = %err, "Comparison failed");
                state.lifecycle = CompareState::Failed(err.clone());
                return Err(err);
            }
        };

        state.ingest(rows, self.config.default_filter());
        state.lifecycle = CompareState::Succeeded;
        state.progress = Progress::completed();

        let counts = state.results.status_counts();
        let summary = CompareSummary {
            token,
            counts,
            total: counts.total(),
            started_at,
            ended_at: Utc::now(),
        };

        info!(
            %token,
            attempt,
            total = summary.total,
            different = counts.different,
            source_only = counts.source_only,
            target_only = counts.target_only,
            "Comparison succeeded"
        );
        Ok(summary)
    }

    /// Latest known state and progress. Never drives the computation.
    pub async fn poll_progress(&self, token: SessionToken) -> Result<SessionProgress, CompareError> {
        self.registry
            .with_state(token, |state| SessionProgress {
                state: state.lifecycle.clone(),
                progress: state.progress.clone(),
            })
            .await
    }

    pub async fn state(&self, token: SessionToken) -> Result<CompareState, CompareError> {
        self.registry
            .with_state(token, |state| state.lifecycle.clone())
            .await
    }

    /// Stops a running comparison and returns the session to `Idle`.
    /// Outside `Comparing` this does nothing.
    pub async fn cancel(&self, token: SessionToken) -> Result<(), CompareError> {
        let default_filter = self.config.default_filter();
        let canceled = self
            .registry
            .with_state(token, |state| {
                if state.lifecycle != CompareState::Comparing {
                    return false;
                }
                state.reset(default_filter);
                state.lifecycle = CompareState::Idle;
                state.progress = Progress::default();
                true
            })
            .await?;

        if canceled {
            info!(%token, "Comparison canceled");
        } else {
            debug!(%token, "Cancel ignored, no comparison running");
        }
        Ok(())
    }

    fn spawn_compare(&self, session: &Arc<Session>) -> JoinHandle<Result<Vec<DiffRow>, CompareError>> {
        let slot = session.engine_slot.clone();
        let retry = self.retry.clone();
        let engine = self.engine.clone();
        let source = session.source.clone();
        let target = session.target.clone();
        let token = session.token;

        tokio::spawn(async move {
            // Released when this task finishes or is aborted
            let _slot = slot.lock_owned().await;

            retry
                .run(move || {
                    let engine = engine.clone();
                    let source = source.clone();
                    let target = target.clone();
                    async move { engine.start_compare(&source, &target, token).await }
                })
                .await
        })
    }

    fn spawn_poller(&self, session: Arc<Session>, attempt: u64) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let period = self.config.poll_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let polled = engine.get_progress(session.token).await;

                let mut state = session.state.lock().await;
                if state.attempt != attempt || state.lifecycle != CompareState::Comparing {
                    debug!(token = %session.token, attempt, "Poller stopping, attempt no longer current");
                    break;
                }

                match polled {
                    Ok(progress) => {
                        debug!(token = %session.token, percent = progress.percent, phase = %progress.phase, "Progress");
                        state.progress = progress;
                    }
                    Err(err) => debug!(token = %session.token, error = %err, "Progress query failed"),
                }
            }
        })
    }
}

fn validate_rows(rows: Vec<DiffRow>) -> Result<Vec<DiffRow>, CompareError> {
    for row in &rows {
        row.check_ids().map_err(CompareError::Engine)?;
    }
    Ok(rows)
}
