use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;

use crate::{
    errors::CompareError,
    types::{
        CompareState, DdlDelta, DiffRow, DiffStatus, Endpoint, Progress, ResultSet, RowId,
        SessionToken,
    },
};

/// The delta most recently produced by `inspect`, with the row it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct CurrentDelta {
    pub row_id: RowId,
    pub delta: DdlDelta,
}

#[derive(Debug, Default)]
struct SessionTasks {
    compare: Option<AbortHandle>,
    poller: Option<AbortHandle>,
}

/// Mutable part of a session, always accessed under the session lock.
#[derive(Debug)]
pub struct SessionState {
    pub lifecycle: CompareState,
    pub progress: Progress,
    pub results: ResultSet,
    pub current_delta: Option<CurrentDelta>,
    /// Bumped by every compare, cancel and close. Work tagged with an older
    /// value is discarded.
    pub attempt: u64,
    /// Bumped by every inspect, compare, cancel and close.
    pub inspect_seq: u64,
    next_row_id: u64,
    tasks: SessionTasks,
}

impl SessionState {
    fn new(default_filter: BTreeSet<DiffStatus>) -> Self {
        Self {
            lifecycle: CompareState::Idle,
            progress: Progress::default(),
            results: ResultSet::empty(default_filter),
            current_delta: None,
            attempt: 0,
            inspect_seq: 0,
            next_row_id: 1,
            tasks: SessionTasks::default(),
        }
    }

    /// Drops results, selection and current delta, and invalidates every
    /// in-flight compare and inspect. Returns the new attempt number.
    pub fn reset(&mut self, default_filter: BTreeSet<DiffStatus>) -> u64 {
        self.stop_tasks();
        self.attempt += 1;
        self.inspect_seq += 1;
        self.results = ResultSet::empty(default_filter);
        self.current_delta = None;
        self.attempt
    }

    /// Installs the rows of a finished attempt. Row ids keep counting across
    /// attempts, so ids handed out earlier never resolve again.
    pub fn ingest(&mut self, rows: Vec<DiffRow>, filter: BTreeSet<DiffStatus>) {
        let count = rows.len() as u64;
        self.results = ResultSet::ingest(rows, self.next_row_id, filter);
        self.next_row_id += count;
    }

    pub fn track_compare(&mut self, compare: AbortHandle, poller: AbortHandle) {
        self.tasks.compare = Some(compare);
        self.tasks.poller = Some(poller);
    }

    pub fn stop_poller(&mut self) {
        if let Some(poller) = self.tasks.poller.take() {
            poller.abort();
        }
    }

    pub fn stop_tasks(&mut self) {
        if let Some(compare) = self.tasks.compare.take() {
            compare.abort();
        }
        self.stop_poller();
    }
}

/// One comparison context between a source and a target endpoint.
#[derive(Debug)]
pub struct Session {
    pub token: SessionToken,
    pub source: Endpoint,
    pub target: Endpoint,
    pub state: Mutex<SessionState>,
    /// Held for the duration of a `start_compare` call.
    pub engine_slot: Arc<Mutex<()>>,
}

impl Session {
    pub fn new(source: Endpoint, target: Endpoint, default_filter: BTreeSet<DiffStatus>) -> Self {
        Self {
            token: SessionToken::generate(),
            source,
            target,
            state: Mutex::new(SessionState::new(default_filter)),
            engine_slot: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionToken, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        self.sessions
            .write()
            .await
            .insert(session.token, session.clone());
        session
    }

    pub async fn get(&self, token: SessionToken) -> Result<Arc<Session>, CompareError> {
        self.sessions
            .read()
            .await
            .get(&token)
            .cloned()
            .ok_or(CompareError::SessionNotFound(token))
    }

    /// Runs `f` against the session state under the session lock.
    pub async fn with_state<R>(
        &self,
        token: SessionToken,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Result<R, CompareError> {
        let session = self.get(token).await?;
        let mut state = session.state.lock().await;
        Ok(f(&mut state))
    }

    pub async fn remove(&self, token: SessionToken) -> Result<Arc<Session>, CompareError> {
        self.sessions
            .write()
            .await
            .remove(&token)
            .ok_or(CompareError::SessionNotFound(token))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
