// Session cookie cache

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::types::{CookieBag, SessionId};
use crate::error::{LoginError, Result};

static PROCESS_CACHE: Lazy<SessionCredentialCache> = Lazy::new(SessionCredentialCache::new);

/// Per-session state: the stored bag and the attempt lock
#[derive(Default)]
struct Slot {
    bag: OnceCell<CookieBag>,

    /// Held for the whole capture; guards the error of the last failed attempt
    last_failure: Mutex<Option<LoginError>>,

    /// Number of failed attempts so far
    failures: AtomicU64,
}

/// Thread-safe store of captured cookies, one bag per session
///
/// Entries live as long as the process. Captures for one session are
/// serialized: callers that wait on an in-flight capture get its result,
/// success or failure, instead of starting their own.
pub struct SessionCredentialCache {
    entries: Arc<DashMap<SessionId, Arc<Slot>>>,
}

impl SessionCredentialCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Handle to the cache shared by the whole process
    pub fn process_wide() -> Self {
        PROCESS_CACHE.clone()
    }

    /// Return the cached bag for `session`, capturing it on first use
    ///
    /// A failed capture stores nothing. Callers already waiting on it receive
    /// the same error; a call made after it finished may capture again.
    pub async fn get_or_create<F, Fut>(&self, session: SessionId, capture: F) -> Result<CookieBag>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CookieBag>>,
    {
        // Clone the slot out so the shard lock is not held across the capture
        let slot = Arc::clone(&*self.entries.entry(session).or_default());

        if let Some(bag) = slot.bag.get() {
            tracing::debug!("Reusing captured cookies for session {}", session);
            return Ok(bag.clone());
        }

        let seen_failures = slot.failures.load(Ordering::SeqCst);
        let mut last_failure = slot.last_failure.lock().await;

        if let Some(bag) = slot.bag.get() {
            return Ok(bag.clone());
        }

        // An attempt finished while we waited; share its outcome
        if slot.failures.load(Ordering::SeqCst) != seen_failures {
            if let Some(ref err) = *last_failure {
                tracing::debug!("Cookie capture for session {} already failed", session);
                return Err(err.clone());
            }
        }

        match capture().await {
            Ok(bag) => {
                *last_failure = None;
                Ok(slot.bag.get_or_init(|| bag).clone())
            }
            Err(err) => {
                *last_failure = Some(err.clone());
                slot.failures.fetch_add(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    /// Get the captured bag for a session, if any
    pub fn get(&self, session: &SessionId) -> Option<CookieBag> {
        self.entries
            .get(session)
            .and_then(|entry| entry.value().bag.get().cloned())
    }

    /// Check if a session has captured cookies
    pub fn contains(&self, session: &SessionId) -> bool {
        self.get(session).is_some()
    }

    /// Number of sessions with captured cookies
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().bag.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionCredentialCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionCredentialCache {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}
