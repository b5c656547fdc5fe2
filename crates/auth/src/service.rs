use crate::directory::DemoDirectory;
use crate::entra::{self, MicrosoftProfile};
use crate::error::AuthError;
use crate::guard::LoginGuard;
use crate::session::SessionStore;
use crate::user::User;
use configuration::{EntraSettings, SecuritySettings};
use std::time::Duration;

/// Signs users in and out of the dashboard.
#[derive(Debug, Clone)]
pub struct AuthService {
    directory: DemoDirectory,
    guard: LoginGuard,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(security: &SecuritySettings) -> Result<Self, AuthError> {
        Self::with_lockout(security, LoginGuard::DEFAULT_LOCKOUT)
    }

    pub fn with_lockout(security: &SecuritySettings, lockout: Duration) -> Result<Self, AuthError> {
        Ok(Self {
            directory: DemoDirectory::new()?,
            guard: LoginGuard::new(security.max_login_attempts, lockout),
            sessions: SessionStore::new(security.session_timeout()),
        })
    }

    /// Checks a username/password pair against the directory.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::EmptyCredentials);
        }

        if let Err(e) = self.guard.check(username) {
            tracing::warn!(username, "Login attempt on a locked account.");
            return Err(e);
        }

        match self.directory.verify(username, password) {
            Some(user) => {
                self.guard.record_success(username);
                tracing::info!(username, profile = %user.profile, "Login succeeded.");
                Ok(user)
            }
            None => {
                let attempts = self.guard.record_failure(username);
                tracing::warn!(username, attempts, "Login failed.");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Authenticates and opens a session. Returns the session id and the user.
    pub fn login(&self, username: &str, password: &str) -> Result<(String, User), AuthError> {
        let user = self.authenticate(username, password)?;
        Ok(self.open_session(user))
    }

    /// Opens a session for a user whose Microsoft profile has already been fetched.
    pub fn login_microsoft(
        &self,
        profile: &MicrosoftProfile,
        settings: &EntraSettings,
    ) -> Result<(String, User), AuthError> {
        if !settings.is_enabled() {
            return Err(AuthError::EntraDisabled);
        }
        let user = entra::user_from_microsoft(profile, settings)?;
        Ok(self.open_session(user))
    }

    pub fn session(&self, session_id: &str) -> Option<User> {
        self.sessions.get(session_id)
    }

    pub fn logout(&self, session_id: &str) {
        if self.sessions.remove(session_id) {
            tracing::info!("User logged out.");
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.active_count()
    }

    fn open_session(&self, user: User) -> (String, User) {
        self.sessions.create(user)
    }
}
