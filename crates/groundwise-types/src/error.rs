use thiserror::Error;

/// Structured output from the generator failed to parse or validate.
///
/// Never surfaced past an agent: the planner and evaluator turn it into
/// their documented fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("generator returned empty output")]
    Empty,

    #[error("no JSON object found in generator output")]
    NoObject,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has wrong type: expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Errors from the vector index.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("vector index unavailable: {0}")]
    Unavailable(String),

    #[error("malformed index entry: {0}")]
    MalformedEntry(String),

    #[error("vector index not configured: {0}")]
    NotConfigured(String),

    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl RetrievalError {
    /// What the operator can do about it, if anything.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            RetrievalError::NotConfigured(_) => Some(
                "build the evidence index first and point [index].path and [index].table at it",
            ),
            RetrievalError::Embedding(_) => {
                Some("check that the embedding model can be downloaded or is cached")
            }
            _ => None,
        }
    }
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("session not found")]
    NotFound,

    #[error("session record is corrupt: {0}")]
    Corrupt(String),

    #[error("storage I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e.to_string())
    }
}
