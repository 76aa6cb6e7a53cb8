//! In-process doubles for the generator, index, and session store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::{Future, ready};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use groundwise_types::error::{PersistenceError, RetrievalError};
use groundwise_types::evidence::IndexHit;
use groundwise_types::llm::{
    CompletionRequest, CompletionResponse, GenerationError, StopReason, Usage,
};
use groundwise_types::session::{Session, SessionId};

use crate::llm::provider::LlmProvider;
use crate::memory::store::SessionStore;
use crate::retrieval::index::VectorIndex;

/// Replays canned completions in order and records every request.
///
/// Once the script is exhausted every call fails.
pub(crate) struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    unavailable: bool,
    log: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub(crate) fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            unavailable: false,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A backend that is never reachable.
    pub(crate) fn failing() -> Self {
        Self {
            unavailable: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    pub(crate) fn log(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.log)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, GenerationError>> + Send {
        self.log.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        let result = match (self.unavailable, next) {
            (true, _) => Err(GenerationError::Unavailable {
                endpoint: "http://localhost:11434/v1".to_string(),
                message: "connection refused".to_string(),
            }),
            (false, Some(content)) => Ok(CompletionResponse {
                id: "resp-scripted".to_string(),
                content,
                model: "scripted-model".to_string(),
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
            }),
            (false, None) => Err(GenerationError::Provider {
                message: "script exhausted".to_string(),
            }),
        };
        ready(result)
    }
}

/// Fixed query-to-hits table.
#[derive(Default)]
pub(crate) struct StaticIndex {
    hits: HashMap<String, Vec<IndexHit>>,
    failing: HashSet<String>,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl StaticIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_hits(mut self, query: &str, hits: Vec<IndexHit>) -> Self {
        self.hits.insert(query.to_string(), hits);
        self
    }

    pub(crate) fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<(String, usize)>>> {
        Arc::clone(&self.calls)
    }
}

impl VectorIndex for StaticIndex {
    fn name(&self) -> &str {
        "static"
    }

    fn search(
        &self,
        query: &str,
        k: usize,
    ) -> impl Future<Output = Result<Vec<IndexHit>, RetrievalError>> + Send {
        self.calls.lock().unwrap().push((query.to_string(), k));
        let result = if self.failing.contains(query) {
            Err(RetrievalError::Unavailable("index offline".to_string()))
        } else {
            Ok(self
                .hits
                .get(query)
                .map(|hits| hits.iter().take(k).cloned().collect())
                .unwrap_or_default())
        };
        ready(result)
    }

    fn count(&self) -> impl Future<Output = Result<u64, RetrievalError>> + Send {
        ready(Ok(self.hits.values().map(Vec::len).sum::<usize>() as u64))
    }
}

/// Session store over raw JSON strings, so tests can plant corrupt records
/// and simulate write failures.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    records: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub(crate) fn raw(&self, id: &str) -> Option<String> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub(crate) fn put_raw(&self, id: &str, raw: &str) {
        self.records.lock().unwrap().insert(id.to_string(), raw.to_string());
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SessionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, id: &SessionId) -> impl Future<Output = Result<Session, PersistenceError>> + Send {
        let result = match self.raw(id.as_str()) {
            None => Err(PersistenceError::NotFound),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| PersistenceError::Corrupt(e.to_string())),
        };
        ready(result)
    }

    fn save(&self, session: &Session) -> impl Future<Output = Result<(), PersistenceError>> + Send {
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(PersistenceError::Io("disk full".to_string()))
        } else {
            let raw = serde_json::to_string(session).unwrap();
            self.put_raw(session.id.as_str(), &raw);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        ready(result)
    }

    fn list(&self) -> impl Future<Output = Result<Vec<SessionId>, PersistenceError>> + Send {
        let mut ids: Vec<SessionId> = self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter_map(|k| SessionId::new(k.as_str()).ok())
            .collect();
        ids.sort();
        ready(Ok(ids))
    }
}
