use crate::user::User;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Session {
    user: User,
    started_at: Instant,
}

/// Opaque session ids mapped to the signed-in user.
///
/// A session lives for `timeout` from its creation. Expired sessions are
/// dropped when they are next looked up, and all of them are purged whenever
/// a new session is created.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            timeout,
        }
    }

    /// Starts a session for `user`. Returns the session id and the user
    /// stamped with it.
    pub fn create(&self, mut user: User) -> (String, User) {
        let id = Uuid::new_v4().to_string();
        user.session_id = Some(id.clone());
        user.last_login = Some(Utc::now());

        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let timeout = self.timeout;
        sessions.retain(|_, session| session.started_at.elapsed() <= timeout);
        sessions.insert(
            id.clone(),
            Session {
                user: user.clone(),
                started_at: Instant::now(),
            },
        );
        (id, user)
    }

    pub fn get(&self, id: &str) -> Option<User> {
        {
            let sessions = match self.sessions.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let session = sessions.get(id)?;
            if session.started_at.elapsed() <= self.timeout {
                return Some(session.user.clone());
            }
        }

        tracing::info!("Session expired.");
        self.remove(id);
        None
    }

    /// Ends a session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.remove(id).is_some()
    }

    pub fn active_count(&self) -> usize {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .values()
            .filter(|s| s.started_at.elapsed() <= self.timeout)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{AuthProvider, Profile};
    use std::thread;

    fn user() -> User {
        User {
            id: "2".to_string(),
            username: "gestor".to_string(),
            email: "gestor@demo.com".to_string(),
            full_name: "Gestor Demo".to_string(),
            profile: Profile::Gestor,
            active: true,
            provider: AuthProvider::Demo,
            session_id: None,
            last_login: None,
        }
    }

    #[test]
    fn created_session_resolves_to_user() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (id, created) = store.create(user());
        assert_eq!(created.session_id.as_deref(), Some(id.as_str()));

        let found = store.get(&id).unwrap();
        assert_eq!(found.username, "gestor");
        assert_eq!(found.session_id.as_deref(), Some(id.as_str()));
        assert!(found.last_login.is_some());
        assert_eq!(store.active_count(), 1);

        assert!(store.remove(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.remove(&id));
    }

    #[test]
    fn sessions_expire() {
        let store = SessionStore::new(Duration::from_millis(5));
        let (id, _) = store.create(user());
        thread::sleep(Duration::from_millis(10));
        assert!(store.get(&id).is_none());
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn creating_a_session_purges_expired_ones() {
        let store = SessionStore::new(Duration::from_millis(200));
        for _ in 0..100 {
            store.create(user());
        }
        assert_eq!(store.sessions.read().unwrap().len(), 100);

        thread::sleep(Duration::from_millis(300));
        let (id, _) = store.create(user());

        let sessions = store.sessions.read().unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key(&id));
    }

    #[test]
    fn unknown_id_is_rejected() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.get("not-a-session").is_none());
    }
}
