use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sdiff::{
    engine::DiffEngine,
    errors::EngineError,
    types::{Credentials, DdlDelta, DeltaRequest, DiffRow, Endpoint, Progress, SessionToken},
};
use tokio::sync::Notify;

/// Scripted diff engine. Records every call and answers from canned data.
#[derive(Default)]
pub struct FakeEngine {
    rows: Mutex<Vec<DiffRow>>,
    deltas: HashMap<i64, DdlDelta>,
    delta_delays: HashMap<i64, Duration>,
    compare_delay: Duration,
    compare_gate: Option<Arc<Notify>>,
    progress_gate: Option<(Arc<Notify>, Arc<Notify>)>,
    progress: Mutex<Progress>,

    passwords: HashMap<Endpoint, String>,
    sticky_challenges: HashSet<Endpoint>,
    delta_challenges: HashSet<Endpoint>,
    connected: Mutex<HashSet<Endpoint>>,

    pub start_calls: Mutex<Vec<(Endpoint, Endpoint, SessionToken)>>,
    pub connect_calls: Mutex<Vec<Endpoint>>,
    pub delta_calls: Mutex<Vec<DeltaRequest>>,
    pub released: Mutex<Vec<SessionToken>>,
}

impl FakeEngine {
    pub fn new(rows: Vec<DiffRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    /// Delta returned for the object whose source (or else target) oid is `oid`.
    pub fn with_delta(mut self, oid: i64, diff_ddl: &str) -> Self {
        self.deltas.insert(
            oid,
            DdlDelta {
                source_ddl: format!("-- source {}", oid),
                target_ddl: format!("-- target {}", oid),
                diff_ddl: diff_ddl.to_string(),
            },
        );
        self
    }

    pub fn with_delta_delay(mut self, oid: i64, delay: Duration) -> Self {
        self.delta_delays.insert(oid, delay);
        self
    }

    pub fn with_compare_delay(mut self, delay: Duration) -> Self {
        self.compare_delay = delay;
        self
    }

    /// `start_compare` waits for a permit on `gate` before returning rows.
    pub fn with_compare_gate(mut self, gate: Arc<Notify>) -> Self {
        self.compare_gate = Some(gate);
        self
    }

    /// `get_progress` signals `entered`, then holds its answer until `release`.
    pub fn with_progress_gate(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.progress_gate = Some((entered, release));
        self
    }

    /// Challenges `endpoint` until it is connected with `password`.
    pub fn with_password(mut self, endpoint: Endpoint, password: &str) -> Self {
        self.passwords.insert(endpoint, password.to_string());
        self
    }

    /// Challenges `endpoint` on every call, connected or not.
    pub fn with_sticky_challenge(mut self, endpoint: Endpoint) -> Self {
        self.sticky_challenges.insert(endpoint);
        self
    }

    /// Challenges `endpoint` on every DDL delta fetch only.
    pub fn with_delta_challenge(mut self, endpoint: Endpoint) -> Self {
        self.delta_challenges.insert(endpoint);
        self
    }

    /// Drops an established connection; the next call is challenged again.
    pub fn invalidate(&self, endpoint: &Endpoint) {
        self.connected.lock().unwrap().remove(endpoint);
    }

    pub fn set_rows(&self, rows: Vec<DiffRow>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.lock().unwrap().len()
    }

    fn session_endpoints(&self, token: SessionToken) -> Result<(Endpoint, Endpoint), EngineError> {
        self.start_calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, _, t)| *t == token)
            .map(|(source, target, _)| (source.clone(), target.clone()))
            .ok_or_else(|| EngineError::Failure(format!("no comparison for session {}", token)))
    }

    fn check_access(&self, endpoint: &Endpoint) -> Result<(), EngineError> {
        if self.sticky_challenges.contains(endpoint) {
            return Err(EngineError::CredentialChallenge(endpoint.clone()));
        }
        if self.passwords.contains_key(endpoint) && !self.connected.lock().unwrap().contains(endpoint) {
            return Err(EngineError::CredentialChallenge(endpoint.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl DiffEngine for FakeEngine {
    async fn start_compare(
        &self,
        source: &Endpoint,
        target: &Endpoint,
        token: SessionToken,
    ) -> Result<Vec<DiffRow>, EngineError> {
        self.start_calls
            .lock()
            .unwrap()
            .push((source.clone(), target.clone(), token));

        self.check_access(source)?;
        self.check_access(target)?;

        *self.progress.lock().unwrap() = Progress::new(50, "Comparing Tables");

        if let Some(gate) = &self.compare_gate {
            gate.notified().await;
        }
        if !self.compare_delay.is_zero() {
            tokio::time::sleep(self.compare_delay).await;
        }

        Ok(self.rows.lock().unwrap().clone())
    }

    async fn get_progress(&self, _token: SessionToken) -> Result<Progress, EngineError> {
        if let Some((entered, release)) = &self.progress_gate {
            entered.notify_one();
            release.notified().await;
            return Ok(Progress::new(75, "Comparing Views"));
        }
        Ok(self.progress.lock().unwrap().clone())
    }

    async fn get_ddl_delta(
        &self,
        token: SessionToken,
        request: &DeltaRequest,
    ) -> Result<DdlDelta, EngineError> {
        self.delta_calls.lock().unwrap().push(request.clone());

        let (source, target) = self.session_endpoints(token)?;
        for (endpoint, oid) in [(source, request.source_object_id), (target, request.target_object_id)] {
            if oid.is_none() {
                continue;
            }
            if self.delta_challenges.contains(&endpoint) {
                return Err(EngineError::CredentialChallenge(endpoint));
            }
            self.check_access(&endpoint)?;
        }

        let Some(oid) = request.source_object_id.or(request.target_object_id) else {
            return Err(EngineError::Failure("request without object ids".to_string()));
        };

        if let Some(delay) = self.delta_delays.get(&oid) {
            tokio::time::sleep(*delay).await;
        }

        Ok(self.deltas.get(&oid).cloned().unwrap_or_default())
    }

    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: Option<&Credentials>,
    ) -> Result<(), EngineError> {
        self.connect_calls.lock().unwrap().push(endpoint.clone());

        let Some(expected) = self.passwords.get(endpoint) else {
            return Ok(());
        };
        match credentials {
            None => Err(EngineError::CredentialChallenge(endpoint.clone())),
            Some(c) if c.password == *expected => {
                self.connected.lock().unwrap().insert(endpoint.clone());
                Ok(())
            }
            Some(_) => Err(EngineError::Authentication {
                endpoint: endpoint.clone(),
                reason: "password authentication failed".to_string(),
            }),
        }
    }

    async fn release(&self, token: SessionToken) {
        self.released.lock().unwrap().push(token);
    }
}
