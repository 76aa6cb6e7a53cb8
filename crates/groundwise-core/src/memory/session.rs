//! SessionMemory: one session's turn log and fact map, written through.
//!
//! Every mutation persists the full record before returning. If the write
//! fails the in-memory change is rolled back, so memory and storage never
//! disagree about what happened.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use groundwise_types::error::PersistenceError;
use groundwise_types::session::{Role, Session, SessionId, Turn, USER_CONTEXT_FACT};

use super::store::BoxSessionStore;

static CORRUPT_READS: AtomicU64 = AtomicU64::new(0);

/// Number of session records reinitialised because they could not be read.
pub fn corrupt_reads() -> u64 {
    CORRUPT_READS.load(Ordering::Relaxed)
}

/// Exclusive owner of one [`Session`].
///
/// Callers must not open two `SessionMemory` values for the same id at once;
/// the last writer would silently win.
pub struct SessionMemory {
    store: Arc<BoxSessionStore>,
    session: Session,
}

impl SessionMemory {
    /// Load `id`, or create and persist an empty session.
    ///
    /// A corrupt or unreadable record is logged, counted, and replaced by an
    /// empty session. Only a failure to write the fresh record is returned.
    #[tracing::instrument(name = "open_session", skip(store), fields(store = %store.name(), session_id = %id))]
    pub async fn open(store: Arc<BoxSessionStore>, id: SessionId) -> Result<Self, PersistenceError> {
        let loaded = match store.load(&id).await {
            Ok(session) if session.id == id => Some(session),
            Ok(session) => {
                reinit_warning(
                    &id,
                    &PersistenceError::Corrupt(format!("record belongs to session '{}'", session.id)),
                );
                None
            }
            Err(PersistenceError::NotFound) => None,
            Err(e) => {
                reinit_warning(&id, &e);
                None
            }
        };

        let session = match loaded {
            Some(session) => session,
            None => {
                let fresh = Session::empty(id);
                store.save(&fresh).await?;
                tracing::debug!("initialised new session");
                fresh
            }
        };

        Ok(Self { store, session })
    }

    pub fn id(&self) -> &SessionId {
        &self.session.id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn get_facts(&self) -> &BTreeMap<String, Value> {
        &self.session.facts
    }

    pub fn get_fact(&self, key: &str) -> Option<&Value> {
        self.session.facts.get(key)
    }

    /// Overwrite one fact and persist.
    pub async fn set_fact(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), PersistenceError> {
        self.set_facts([(key.into(), value)]).await
    }

    /// Overwrite several facts with a single write. No-op when every value
    /// is already stored.
    pub async fn set_facts<I>(&mut self, facts: I) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let changed: Vec<(String, Value)> = facts
            .into_iter()
            .filter(|(k, v)| self.session.facts.get(k) != Some(v))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        let previous_facts = self.session.facts.clone();
        let previous_updated = self.session.updated_at;
        for (key, value) in changed {
            self.session.facts.insert(key, value);
        }

        if let Err(e) = self.persist().await {
            self.session.facts = previous_facts;
            self.session.updated_at = previous_updated;
            return Err(e);
        }
        Ok(())
    }

    /// Append one turn and persist.
    pub async fn add_turn(
        &mut self,
        role: Role,
        text: impl Into<String>,
        citations: Vec<String>,
    ) -> Result<(), PersistenceError> {
        self.append_turns(vec![(role, text.into(), citations)]).await
    }

    /// Append a user question and its answer with a single write.
    pub async fn record_exchange(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
        citations: Vec<String>,
    ) -> Result<(), PersistenceError> {
        self.append_turns(vec![
            (Role::User, question.into(), Vec::new()),
            (Role::Assistant, answer.into(), citations),
        ])
        .await
    }

    async fn append_turns(
        &mut self,
        turns: Vec<(Role, String, Vec<String>)>,
    ) -> Result<(), PersistenceError> {
        let previous_len = self.session.turns.len();
        let previous_updated = self.session.updated_at;

        for (role, text, citations) in turns {
            let timestamp = next_timestamp(self.session.last_turn_at());
            self.session.turns.push(Turn {
                role,
                text,
                timestamp,
                citations,
            });
        }

        if let Err(e) = self.persist().await {
            self.session.turns.truncate(previous_len);
            self.session.updated_at = previous_updated;
            return Err(e);
        }
        Ok(())
    }

    /// The last `n` turns, most recent last.
    pub fn get_recent_turns(&self, n: usize) -> &[Turn] {
        let turns = &self.session.turns;
        &turns[turns.len().saturating_sub(n)..]
    }

    /// Append a line of free-text context to the `user_context` fact.
    pub async fn append_context(&mut self, text: &str) -> Result<(), PersistenceError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let combined = match self.get_fact(USER_CONTEXT_FACT).and_then(Value::as_str) {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}\n{text}"),
            _ => text.to_string(),
        };
        self.set_fact(USER_CONTEXT_FACT, Value::String(combined)).await
    }

    /// Everything the agents should know about the user, as prompt text.
    ///
    /// The `user_context` fact comes first, then every other fact as a
    /// `key: value` line in key order.
    pub fn user_context(&self) -> String {
        let mut lines = Vec::new();
        if let Some(context) = self.get_fact(USER_CONTEXT_FACT).and_then(Value::as_str) {
            let context = context.trim();
            if !context.is_empty() {
                lines.push(context.to_string());
            }
        }
        for (key, value) in &self.session.facts {
            if key == USER_CONTEXT_FACT {
                continue;
            }
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("{key}: {rendered}"));
        }
        lines.join("\n")
    }

    /// Drop every turn and fact, keeping the session id and creation time.
    pub async fn clear(&mut self) -> Result<(), PersistenceError> {
        let previous = self.session.clone();
        self.session.turns.clear();
        self.session.facts.clear();
        if let Err(e) = self.persist().await {
            self.session = previous;
            return Err(e);
        }
        Ok(())
    }

    async fn persist(&mut self) -> Result<(), PersistenceError> {
        self.session.updated_at = Utc::now();
        self.store.save(&self.session).await
    }
}

fn reinit_warning(id: &SessionId, error: &PersistenceError) {
    let total = CORRUPT_READS.fetch_add(1, Ordering::Relaxed) + 1;
    tracing::warn!(
        session_id = %id,
        error = %error,
        corrupt_reads = total,
        "Session record unreadable; reinitialising empty session"
    );
}

/// Wall-clock now, bumped past `last` so turn order stays strictly increasing.
fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn sid(raw: &str) -> SessionId {
        SessionId::new(raw).unwrap()
    }

    async fn open(store: &MemoryStore, id: &str) -> SessionMemory {
        SessionMemory::open(Arc::new(BoxSessionStore::new(store.clone())), sid(id))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_and_persists_empty_session() {
        let store = MemoryStore::default();
        let memory = open(&store, "s1").await;
        assert!(memory.session().turns.is_empty());
        assert!(memory.get_facts().is_empty());
        assert!(store.raw("s1").is_some());
    }

    #[tokio::test]
    async fn test_add_turn_then_reload_reproduces_turns() {
        let store = MemoryStore::default();
        {
            let mut memory = open(&store, "s1").await;
            memory.add_turn(Role::User, "hello", vec![]).await.unwrap();
            memory
                .add_turn(Role::Assistant, "hi [c1]", vec!["c1".to_string()])
                .await
                .unwrap();
        }
        let reloaded = open(&store, "s1").await;
        let turns = &reloaded.session().turns;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "hello");
        assert_eq!(turns[1].citations, vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_turn_timestamps_strictly_increase() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        for i in 0..20 {
            memory.add_turn(Role::User, format!("t{i}"), vec![]).await.unwrap();
        }
        let turns = &memory.session().turns;
        assert!(turns.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_get_facts_is_stable_between_reads() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        memory.set_fact("b", json!(2)).await.unwrap();
        memory.set_fact("a", json!("x")).await.unwrap();
        let first = memory.get_facts().clone();
        let second = memory.get_facts().clone();
        assert_eq!(first, second);
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_set_fact_last_write_wins() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        memory.set_fact("destination_place", json!("Sydney")).await.unwrap();
        memory.set_fact("destination_place", json!("Perth")).await.unwrap();
        let reloaded = open(&store, "s1").await;
        assert_eq!(reloaded.get_fact("destination_place"), Some(&json!("Perth")));
    }

    #[tokio::test]
    async fn test_corrupt_record_reinitialises() {
        let store = MemoryStore::default();
        store.put_raw("s1", "{ not json");
        let before = corrupt_reads();
        let memory = open(&store, "s1").await;
        assert!(memory.session().turns.is_empty());
        assert!(corrupt_reads() > before);
        // The fresh record replaced the corrupt one.
        assert!(serde_json::from_str::<Session>(&store.raw("s1").unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_turn() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        memory.add_turn(Role::User, "kept", vec![]).await.unwrap();

        store.fail_writes(true);
        let err = memory.add_turn(Role::User, "lost", vec![]).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
        assert_eq!(memory.session().turns.len(), 1);

        let err = memory.set_fact("k", json!(1)).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
        assert!(memory.get_fact("k").is_none());
    }

    #[tokio::test]
    async fn test_get_recent_turns_returns_tail() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        for i in 0..5 {
            memory.add_turn(Role::User, format!("t{i}"), vec![]).await.unwrap();
        }
        let recent: Vec<&str> = memory.get_recent_turns(2).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(recent, vec!["t3", "t4"]);
        assert_eq!(memory.get_recent_turns(50).len(), 5);
        assert!(memory.get_recent_turns(0).is_empty());
    }

    #[tokio::test]
    async fn test_user_context_rendering() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        assert_eq!(memory.user_context(), "");

        memory.append_context("I'm flying from Sydney").await.unwrap();
        memory.append_context("I have a CPAP machine").await.unwrap();
        memory.set_fact("topic_medical", json!(true)).await.unwrap();
        memory.set_fact("departure_place", json!("Sydney")).await.unwrap();

        assert_eq!(
            memory.user_context(),
            "I'm flying from Sydney\nI have a CPAP machine\ndeparture_place: Sydney\ntopic_medical: true"
        );
    }

    #[tokio::test]
    async fn test_record_exchange_is_single_write() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        let writes_before = store.writes();
        memory
            .record_exchange("q?", "a [c1]", vec!["c1".to_string()])
            .await
            .unwrap();
        assert_eq!(store.writes(), writes_before + 1);
        assert_eq!(memory.session().turns.len(), 2);
    }

    #[tokio::test]
    async fn test_set_facts_skips_unchanged() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        memory.set_fact("a", json!(1)).await.unwrap();
        let writes_before = store.writes();
        memory.set_facts([("a".to_string(), json!(1))]).await.unwrap();
        assert_eq!(store.writes(), writes_before);
    }

    #[tokio::test]
    async fn test_clear_keeps_identity() {
        let store = MemoryStore::default();
        let mut memory = open(&store, "s1").await;
        let created = memory.session().created_at;
        memory.add_turn(Role::User, "x", vec![]).await.unwrap();
        memory.set_fact("a", json!(1)).await.unwrap();
        memory.clear().await.unwrap();
        assert!(memory.session().turns.is_empty());
        assert!(memory.get_facts().is_empty());
        assert_eq!(memory.session().created_at, created);
        assert_eq!(memory.id().as_str(), "s1");
    }
}
