//! Session, turn, and fact types for Groundwise.
//!
//! A session is the durable per-conversation record: an append-only turn log
//! plus a last-write-wins fact map. The on-disk JSON shape is
//! `{session_id, created_at, updated_at, turns, facts}`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted session identifier.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Fact key under which free-text user context accumulates.
pub const USER_CONTEXT_FACT: &str = "user_context";

/// Stable identifier for a session.
///
/// Used as the storage key and as a file-name component, so it is restricted
/// to `[A-Za-z0-9_.-]`, must not start with `.`, and is at most
/// [`MAX_SESSION_ID_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a raw identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err("session id must not be empty".to_string());
        }
        if raw.len() > MAX_SESSION_ID_LEN {
            return Err(format!(
                "session id is {} characters, max is {MAX_SESSION_ID_LEN}",
                raw.len()
            ));
        }
        if raw.starts_with('.') {
            return Err(format!("session id '{raw}' must not start with '.'"));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(format!("session id '{raw}' contains invalid character '{bad}'"));
        }
        Ok(Self(raw))
    }

    /// Generate a fresh, time-sortable identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

/// One utterance in a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Chunk ids referenced by an assistant answer, in first-cited order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
}

/// Durable record of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "session_id")]
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub turns: Vec<Turn>,
    /// Ordered so two reads with no write in between are identical.
    #[serde(default)]
    pub facts: BTreeMap<String, serde_json::Value>,
}

impl Session {
    /// A fresh session with no turns and no facts.
    pub fn empty(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            turns: Vec::new(),
            facts: BTreeMap::new(),
        }
    }

    /// Timestamp of the most recent turn, if any.
    pub fn last_turn_at(&self) -> Option<DateTime<Utc>> {
        self.turns.last().map(|t| t.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_accepts_safe_names() {
        for raw in ["default", "user_42", "a.b-c", "X9"] {
            assert!(SessionId::new(raw).is_ok(), "{raw} should be valid");
        }
    }

    #[test]
    fn test_session_id_rejects_unsafe_names() {
        for raw in ["", "../etc", ".hidden", "a/b", "has space", "semi;colon"] {
            assert!(SessionId::new(raw).is_err(), "{raw:?} should be rejected");
        }
        let too_long = "a".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(SessionId::new(too_long).is_err());
    }

    #[test]
    fn test_session_id_generate_is_valid() {
        let id = SessionId::generate();
        assert!(SessionId::new(id.as_str()).is_ok());
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::User, Role::Assistant] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_turn_omits_empty_citations() {
        let turn = Turn {
            role: Role::User,
            text: "hi".to_string(),
            timestamp: Utc::now(),
            citations: Vec::new(),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert!(json.get("citations").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_session_json_shape() {
        let mut session = Session::empty(SessionId::new("s1").unwrap());
        session
            .facts
            .insert("destination_place".to_string(), serde_json::json!("Los Angeles"));
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert!(json["turns"].as_array().unwrap().is_empty());
        assert_eq!(json["facts"]["destination_place"], "Los Angeles");

        let parsed: Session = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn test_session_rejects_invalid_id_on_load() {
        let json = serde_json::json!({
            "session_id": "../x",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
        });
        assert!(serde_json::from_value::<Session>(json).is_err());
    }
}
