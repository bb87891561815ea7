//! Application state for the study server

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::app::StudyAssistant;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::session::StudySession;

/// Session handle; requests for one session run one at a time
pub type SessionHandle = Arc<Mutex<StudySession>>;

/// A live session and when it was last looked up
struct SessionSlot {
    handle: SessionHandle,
    last_used: parking_lot::Mutex<Instant>,
}

impl SessionSlot {
    fn idle_for(&self) -> Duration {
        self.last_used.lock().elapsed()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Shared knowledge base, registry and cache
    assistant: StudyAssistant,
    /// Live sessions by id
    sessions: DashMap<Uuid, SessionSlot>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state
    pub async fn new(config: RagConfig) -> Result<Self> {
        let assistant = StudyAssistant::new(config.clone()).await?;
        Ok(Self::with_assistant(config, assistant))
    }

    /// Wrap an already built assistant
    pub fn with_assistant(config: RagConfig, assistant: StudyAssistant) -> Self {
        tracing::info!(
            "Application state ready ({} documents)",
            assistant.documents().len()
        );
        Self {
            inner: Arc::new(AppStateInner {
                config,
                assistant,
                sessions: DashMap::new(),
                ready: RwLock::new(true),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn assistant(&self) -> &StudyAssistant {
        &self.inner.assistant
    }

    /// Register a session and return its id
    ///
    /// Idle sessions are pruned first; at `max_sessions` the least recently
    /// used one is dropped to make room.
    pub fn add_session(&self, session: StudySession) -> Uuid {
        let server = &self.inner.config.server;
        if server.session_idle_secs > 0 {
            self.prune_idle_sessions(Duration::from_secs(server.session_idle_secs));
        }
        while self.inner.sessions.len() >= server.max_sessions.max(1) {
            if !self.evict_least_recent() {
                break;
            }
        }

        let id = session.id();
        self.inner.sessions.insert(
            id,
            SessionSlot {
                handle: Arc::new(Mutex::new(session)),
                last_used: parking_lot::Mutex::new(Instant::now()),
            },
        );
        tracing::info!("Created session {}", id);
        id
    }

    /// Look up a session and mark it used
    pub fn session(&self, id: &Uuid) -> Result<SessionHandle> {
        self.inner
            .sessions
            .get(id)
            .map(|slot| {
                *slot.last_used.lock() = Instant::now();
                Arc::clone(&slot.handle)
            })
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    pub fn remove_session(&self, id: &Uuid) -> Result<()> {
        self.inner
            .sessions
            .remove(id)
            .map(|_| tracing::info!("Removed session {}", id))
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Drop sessions unused for longer than `max_idle`; returns how many
    pub fn prune_idle_sessions(&self, max_idle: Duration) -> usize {
        let before = self.inner.sessions.len();
        self.inner.sessions.retain(|_, slot| slot.idle_for() <= max_idle);
        let pruned = before.saturating_sub(self.inner.sessions.len());
        if pruned > 0 {
            tracing::info!("Pruned {} idle sessions", pruned);
        }
        pruned
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .inner
            .sessions
            .iter()
            .max_by_key(|entry| entry.value().idle_for())
            .map(|entry| *entry.key());

        match oldest {
            Some(id) => {
                self.inner.sessions.remove(&id);
                tracing::info!("Session limit reached, evicted {}", id);
                true
            }
            None => false,
        }
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{study_assistant, test_config};
    use tempfile::TempDir;

    fn state_with(dir: &TempDir, max_sessions: usize) -> AppState {
        let mut config = test_config(dir);
        config.server.max_sessions = max_sessions;
        AppState::with_assistant(config, study_assistant(dir))
    }

    #[test]
    fn test_idle_sessions_pruned() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, 10);

        let stale = state.add_session(StudySession::new());
        std::thread::sleep(Duration::from_millis(60));
        let fresh = state.add_session(StudySession::new());

        assert_eq!(state.prune_idle_sessions(Duration::from_millis(30)), 1);
        assert!(matches!(state.session(&stale), Err(Error::SessionNotFound(_))));
        assert!(state.session(&fresh).is_ok());
    }

    #[test]
    fn test_session_cap_evicts_least_recently_used() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, 2);

        let first = state.add_session(StudySession::new());
        std::thread::sleep(Duration::from_millis(5));
        let second = state.add_session(StudySession::new());
        std::thread::sleep(Duration::from_millis(5));
        // touching the first makes the second the least recently used
        state.session(&first).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let third = state.add_session(StudySession::new());
        assert_eq!(state.session_count(), 2);
        assert!(state.session(&first).is_ok());
        assert!(state.session(&third).is_ok());
        assert!(state.session(&second).is_err());
    }
}
