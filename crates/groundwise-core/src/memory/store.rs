//! Session store trait and its object-safe wrapper.
//!
//! Implementations (JSON files, SQLite) live in groundwise-infra.

use std::future::Future;
use std::pin::Pin;

use groundwise_types::error::PersistenceError;
use groundwise_types::session::{Session, SessionId};

/// Durable keyed storage for whole session records.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// `load` must distinguish a missing record (`NotFound`) from one that
/// exists but cannot be decoded (`Corrupt`) and from I/O failure (`Io`).
pub trait SessionStore: Send + Sync {
    fn name(&self) -> &str;

    fn load(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<Session, PersistenceError>> + Send;

    /// Replace the stored record with `session` in full.
    fn save(&self, session: &Session) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Identifiers of every stored session, sorted.
    fn list(&self) -> impl Future<Output = Result<Vec<SessionId>, PersistenceError>> + Send;
}

/// Object-safe version of [`SessionStore`] with boxed futures.
pub trait SessionStoreDyn: Send + Sync {
    fn name(&self) -> &str;

    fn load_boxed<'a>(
        &'a self,
        id: &'a SessionId,
    ) -> Pin<Box<dyn Future<Output = Result<Session, PersistenceError>> + Send + 'a>>;

    fn save_boxed<'a>(
        &'a self,
        session: &'a Session,
    ) -> Pin<Box<dyn Future<Output = Result<(), PersistenceError>> + Send + 'a>>;

    fn list_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SessionId>, PersistenceError>> + Send + '_>>;
}

impl<T: SessionStore> SessionStoreDyn for T {
    fn name(&self) -> &str {
        SessionStore::name(self)
    }

    fn load_boxed<'a>(
        &'a self,
        id: &'a SessionId,
    ) -> Pin<Box<dyn Future<Output = Result<Session, PersistenceError>> + Send + 'a>> {
        Box::pin(self.load(id))
    }

    fn save_boxed<'a>(
        &'a self,
        session: &'a Session,
    ) -> Pin<Box<dyn Future<Output = Result<(), PersistenceError>> + Send + 'a>> {
        Box::pin(self.save(session))
    }

    fn list_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SessionId>, PersistenceError>> + Send + '_>> {
        Box::pin(self.list())
    }
}

/// Type-erased session store, selected at runtime from config.
pub struct BoxSessionStore {
    inner: Box<dyn SessionStoreDyn + Send + Sync>,
}

impl BoxSessionStore {
    pub fn new<T: SessionStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn load(&self, id: &SessionId) -> Result<Session, PersistenceError> {
        self.inner.load_boxed(id).await
    }

    pub async fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        self.inner.save_boxed(session).await
    }

    pub async fn list(&self) -> Result<Vec<SessionId>, PersistenceError> {
        self.inner.list_boxed().await
    }
}
