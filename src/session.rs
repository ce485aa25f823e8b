//! Per-tab session state
//!
//! A session lives as long as one browser tab keeps using its id. It owns the
//! chat log and the state of every widget on the page; nothing here is shared
//! between tabs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use rand::RngExt;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::clients::{City, SearchOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// Append-only chat log. Messages are only ever added as complete
/// question/answer pairs, so the length is always even.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            text: question.into(),
        });
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            text: answer.into(),
        });
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Page lifecycle: `Idle -> AwaitingInput -> (Requesting -> Idle)*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageState {
    #[default]
    Idle,
    AwaitingInput,
    Requesting,
}

/// Last search shown in the search panel
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPanel {
    pub query: String,
    pub outcome: SearchOutcome,
}

/// Everything one tab sees on its page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub history: ChatHistory,
    /// Error from the most recent chat submission, cleared on the next one
    pub chat_notice: Option<String>,
    pub search: Option<SearchPanel>,
    pub city: Option<City>,
    pub weather: Option<String>,
    pub place: Option<String>,
    /// Shown once at the top of the next render
    pub page_notice: Option<String>,
    state: PageState,
}

impl Session {
    #[must_use]
    pub fn state(&self) -> PageState {
        self.state
    }

    /// The page has been shown and is waiting for the user
    pub fn mark_rendered(&mut self) {
        if self.state == PageState::Idle {
            self.state = PageState::AwaitingInput;
        }
    }

    pub fn begin_request(&mut self) {
        self.state = PageState::Requesting;
    }

    pub fn finish_request(&mut self) {
        self.state = PageState::Idle;
    }

    /// A session still `Requesting` when the page is shown had its last action
    /// cut off mid-call. Resets the state and reports whether that happened.
    pub fn recover_interrupted(&mut self) -> bool {
        let interrupted = self.state == PageState::Requesting;
        if interrupted {
            self.state = PageState::Idle;
        }
        interrupted
    }
}

/// Opaque id a tab carries in its URL
pub type SessionId = String;

struct Slot {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// All live sessions, keyed by tab id
pub struct SessionStore {
    slots: StdMutex<HashMap<SessionId, Slot>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    #[must_use]
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            slots: StdMutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Start a fresh session and return its id. Expired sessions are dropped
    /// first; at capacity the least recently used one makes room.
    pub fn create(&self) -> SessionId {
        let id = new_session_id();
        let mut slots = self.lock_slots();
        let now = Instant::now();
        let idle_timeout = self.idle_timeout;
        slots.retain(|_, slot| now.duration_since(slot.last_seen) < idle_timeout);
        while slots.len() >= self.max_sessions {
            let Some(oldest) = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_seen)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            tracing::debug!("Session store full, evicting least recently used session");
            slots.remove(&oldest);
        }
        slots.insert(
            id.clone(),
            Slot {
                session: Arc::new(Mutex::new(Session::default())),
                last_seen: now,
            },
        );
        tracing::debug!(live = slots.len(), "Created session");
        id
    }

    /// Look up a session, refreshing its idle timer
    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        let mut slots = self.lock_slots();
        let now = Instant::now();
        let expired = now.duration_since(slots.get(id)?.last_seen) >= self.idle_timeout;
        if expired {
            slots.remove(id);
            return None;
        }
        let slot = slots.get_mut(id)?;
        slot.last_seen = now;
        Some(slot.session.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Slot>> {
        // A panic while holding the map cannot leave it half-updated.
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn new_session_id() -> SessionId {
    let value: u128 = rand::rng().random();
    format!("{value:032x}")
}
