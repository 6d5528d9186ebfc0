// Per-visitor chat sessions for concurrent HTTP clients

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time;
use uuid::Uuid;

use crate::conversation::{recent, ChatTurn, ConversationHistory};
use crate::router::{SideEffect, FAILURE_REPLY};
use crate::tickets::EscalationReason;

/// Notice shown above the chat after a ticket is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Banner {
    Success { ticket_id: String, message: String },
    Error { message: String },
}

impl Banner {
    pub fn ticket_created(ticket_id: &str) -> Self {
        Banner::Success {
            ticket_id: ticket_id.to_string(),
            message: format!("Ticket #{} created by APIMAN.", ticket_id),
        }
    }

    pub fn failure() -> Self {
        Banner::Error {
            message: FAILURE_REPLY.to_string(),
        }
    }
}

/// Per-session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: String,
    pub conversation: ConversationHistory,
    /// Manual ticket form visible
    pub show_manual_form: bool,
    /// Saved-keys panel visible
    pub show_api_keys: bool,
    pub banner: Option<Banner>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Held for the whole of a chat turn so turns on one session run one at a time
    turn_lock: Arc<Mutex<()>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    fn with_id(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            conversation: ConversationHistory::new(),
            show_manual_form: false,
            show_api_keys: false,
            banner: None,
            last_activity: now,
            created_at: now,
            turn_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn turn_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.turn_lock)
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn is_expired(&self, timeout_minutes: u64) -> bool {
        let elapsed = Utc::now().signed_duration_since(self.last_activity);
        elapsed.num_minutes() >= timeout_minutes as i64
    }

    /// Update form flags and banner after a routed turn
    pub fn apply(&mut self, effect: Option<&SideEffect>) {
        match effect {
            Some(SideEffect::TicketCreated { ticket_id, reason }) => {
                self.banner = Some(match reason {
                    EscalationReason::LlmFailure => Banner::failure(),
                    _ => Banner::ticket_created(ticket_id),
                });
            }
            Some(SideEffect::OpenManualTicketForm) => self.show_manual_form = true,
            Some(SideEffect::ShowApiKeys) => self.show_api_keys = true,
            None => {}
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Concurrent session map with idle expiry and a size cap
pub struct SessionManager {
    sessions: Arc<DashMap<String, SessionState>>,
    max_sessions: usize,
    timeout_minutes: u64,
}

impl SessionManager {
    /// Must be called inside a tokio runtime; starts the cleanup task.
    pub fn new(max_sessions: usize, timeout_minutes: u64) -> Self {
        let manager = Self {
            sessions: Arc::new(DashMap::new()),
            max_sessions,
            timeout_minutes,
        };
        manager.start_cleanup_task();
        manager
    }

    /// Fetch a live session or start a new one.
    ///
    /// Unknown ids start a fresh session with a new id.
    pub fn get_or_create(&self, session_id: Option<&str>) -> anyhow::Result<SessionState> {
        if let Some(id) = session_id {
            if let Some(mut session) = self.sessions.get_mut(id) {
                session.touch();
                return Ok(session.clone());
            }
        }

        if self.sessions.len() >= self.max_sessions {
            anyhow::bail!(
                "Maximum session limit reached ({}/{})",
                self.sessions.len(),
                self.max_sessions
            );
        }

        let session = SessionState::new();
        self.sessions.insert(session.id.clone(), session.clone());
        tracing::info!(session_id = %session.id, "Created new session");
        Ok(session)
    }

    pub fn get(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    /// The last `n` turns of a live session, oldest first
    pub fn recent_turns(&self, session_id: &str, n: usize) -> Vec<ChatTurn> {
        self.sessions
            .get(session_id)
            .map(|entry| recent(entry.conversation.turns(), n).to_vec())
            .unwrap_or_default()
    }

    /// Apply `f` to a live session in place
    pub fn modify<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        self.sessions.get_mut(session_id).map(|mut entry| {
            let result = f(&mut entry);
            entry.touch();
            result
        })
    }

    /// Apply `f` in place, restoring the session under the same id when it
    /// expired or was deleted while the turn was in flight
    pub fn modify_or_restore<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> R {
        let mut entry = self.sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::warn!(session_id = %session_id, "Session vanished mid-turn, restoring");
            SessionState::with_id(session_id.to_string())
        });
        let result = f(&mut entry);
        entry.touch();
        result
    }

    pub fn delete(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn start_cleanup_task(&self) {
        let sessions = Arc::clone(&self.sessions);
        let timeout_minutes = self.timeout_minutes;

        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                remove_expired(&sessions, timeout_minutes);
            }
        });
    }
}

fn remove_expired(sessions: &DashMap<String, SessionState>, timeout_minutes: u64) -> usize {
    let expired: Vec<String> = sessions
        .iter()
        .filter(|entry| entry.value().is_expired(timeout_minutes))
        .map(|entry| entry.key().clone())
        .collect();

    let mut removed = 0;
    for session_id in expired {
        if sessions.remove(&session_id).is_some() {
            removed += 1;
            tracing::debug!(session_id = %session_id, "Removed expired session");
        }
    }

    if removed > 0 {
        tracing::info!(removed, active = sessions.len(), "Cleaned up expired sessions");
    }
    removed
}
