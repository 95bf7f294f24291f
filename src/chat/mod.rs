//! Chat transcripts and in-memory chat sessions.
//!
//! A session owns an append-only transcript. Turns are serialized per
//! session: while one message is being answered, further messages to the
//! same session are rejected. Sessions left idle past the store's timeout
//! are dropped the next time a session is created.

use crate::error::{Result, ScoutError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered, append-only list of turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::Assistant, content));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }

    /// Start over with an empty transcript.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Idle timeout used by `SessionStore::new`.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

struct SessionEntry {
    transcript: Transcript,
    busy: bool,
    last_active: Instant,
}

/// In-memory store of chat sessions keyed by id.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    /// Create a store that drops sessions idle for longer than `idle_timeout`.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, SessionEntry>>> {
        self.sessions
            .lock()
            .map_err(|e| ScoutError::Agent(format!("Failed to acquire session lock: {}", e)))
    }

    /// Create an empty session and return its id. Idle sessions are
    /// swept first; a session with a turn in flight is never dropped.
    pub fn create(&self) -> Result<Uuid> {
        let mut sessions = self.lock()?;

        let before = sessions.len();
        let idle_timeout = self.idle_timeout;
        sessions.retain(|_, entry| entry.busy || entry.last_active.elapsed() <= idle_timeout);
        if sessions.len() < before {
            debug!("Dropped {} idle chat session(s)", before - sessions.len());
        }

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            SessionEntry {
                transcript: Transcript::new(),
                busy: false,
                last_active: Instant::now(),
            },
        );
        debug!(session = %id, "Created chat session");
        Ok(id)
    }

    /// Snapshot of a session's transcript.
    pub fn transcript(&self, id: Uuid) -> Result<Transcript> {
        self.lock()?
            .get(&id)
            .map(|entry| entry.transcript.clone())
            .ok_or_else(|| ScoutError::SessionNotFound(id.to_string()))
    }

    /// Append a user message and mark the session busy.
    pub fn begin_turn(&self, id: Uuid, content: &str) -> Result<()> {
        let mut sessions = self.lock()?;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| ScoutError::SessionNotFound(id.to_string()))?;

        if entry.busy {
            return Err(ScoutError::SessionBusy(id.to_string()));
        }

        entry.transcript.push_user(content);
        entry.busy = true;
        entry.last_active = Instant::now();
        Ok(())
    }

    /// Append the assistant answer, release the session and return the transcript.
    pub fn complete_turn(&self, id: Uuid, answer: &str) -> Result<Transcript> {
        let mut sessions = self.lock()?;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| ScoutError::SessionNotFound(id.to_string()))?;

        entry.transcript.push_assistant(answer);
        entry.busy = false;
        entry.last_active = Instant::now();
        Ok(entry.transcript.clone())
    }

    /// Release a session whose turn ended without an answer.
    pub fn abandon_turn(&self, id: Uuid) {
        if let Ok(mut sessions) = self.lock() {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.busy = false;
                entry.last_active = Instant::now();
            }
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
