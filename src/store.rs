//! Session storage behind the funnel engine
//!
//! The engine only needs `get`/`put`; the in-memory store is the default and keeps
//! everything until the process exits unless [`InMemorySessionStore::purge_idle`] runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::funnel::{Session, UserId};

pub trait SessionStore: Send + Sync {
    /// Stored session, or a fresh `Idle` one for an unseen user (not inserted).
    fn get(&self, user_id: UserId) -> Session;

    fn put(&self, session: Session);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self, user_id: UserId) -> Session {
        (**self).get(user_id)
    }

    fn put(&self, session: Session) {
        (**self).put(session)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes sessions not touched since `cutoff`; returns how many were dropped.
    pub fn purge_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.updated_at >= cutoff);
        before - sessions.len()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, user_id: UserId) -> Session {
        self.lock()
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Session::new(user_id))
    }

    fn put(&self, session: Session) {
        self.lock().insert(session.user_id, session);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::State;
    use chrono::Duration;

    #[test]
    fn get_does_not_insert() {
        let store = InMemorySessionStore::new();
        let session = store.get(UserId(1));
        assert_eq!(session.state, State::Idle);
        assert!(store.is_empty());
    }

    #[test]
    fn put_then_get_returns_session() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new(UserId(1));
        session.state = State::Engaged;
        store.put(session.clone());

        assert_eq!(store.get(UserId(1)), session);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn put_replaces_existing_session() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new(UserId(1));
        store.put(session.clone());
        session.state = State::Completed;
        store.put(session);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(UserId(1)).state, State::Completed);
    }

    #[test]
    fn purge_idle_drops_only_stale_sessions() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();

        let mut stale = Session::new(UserId(1));
        stale.updated_at = now - Duration::hours(3);
        let mut fresh = Session::new(UserId(2));
        fresh.updated_at = now;
        store.put(stale);
        store.put(fresh);

        let removed = store.purge_idle(now - Duration::hours(1));

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(UserId(1)).state, State::Idle);
    }

    #[test]
    fn arc_store_shares_state() {
        let store = Arc::new(InMemorySessionStore::new());
        let shared = store.clone();
        shared.put(Session::new(UserId(5)));
        assert_eq!(SessionStore::len(&store), 1);
    }
}
