//! Cookie-keyed registry of browser sessions.

use crate::session::Session;
use axum::http::{HeaderMap, HeaderValue, header};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "medscan_session";

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// A session handed to a request handler.
pub struct ResolvedSession {
    pub id: Uuid,
    pub session: Arc<Mutex<Session>>,
    /// The cookie was missing, unknown or expired, so a fresh session was made.
    pub created: bool,
}

impl ResolvedSession {
    /// `Set-Cookie` value for a newly created session.
    #[must_use]
    pub fn set_cookie(&self) -> Option<HeaderValue> {
        if !self.created {
            return None;
        }
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Strict",
            self.id
        ))
        .ok()
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    search_api_key: Option<Arc<str>>,
    ttl: Duration,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(search_api_key: Option<Arc<str>>, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            search_api_key,
            ttl,
        }
    }

    /// Returns the session for `id`, or a new one when `id` is unknown.
    ///
    /// Idle sessions are evicted first, so an expired cookie starts over.
    pub async fn resolve(&self, id: Option<Uuid>) -> ResolvedSession {
        let mut sessions = self.sessions.write().await;
        self.evict_idle_locked(&mut sessions);

        if let Some(id) = id
            && let Some(entry) = sessions.get_mut(&id)
        {
            entry.last_seen = Instant::now();
            return ResolvedSession {
                id,
                session: Arc::clone(&entry.session),
                created: false,
            };
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(id, self.search_api_key.clone())));
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!("Created session {id} ({} active)", sessions.len());

        ResolvedSession {
            id,
            session,
            created: true,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drops sessions idle for longer than the TTL. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.evict_idle_locked(&mut sessions)
    }

    fn evict_idle_locked(&self, sessions: &mut HashMap<Uuid, SessionEntry>) -> usize {
        let before = sessions.len();
        // A session mid-analysis holds its lock and is never evicted
        sessions.retain(|_, entry| {
            entry.last_seen.elapsed() <= self.ttl || entry.session.try_lock().is_err()
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("Evicted {evicted} idle session(s)");
        }
        evicted
    }
}

/// Reads the session id from the request's `Cookie` headers.
#[must_use]
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}
