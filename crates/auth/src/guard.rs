use crate::error::AuthError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Failed login attempts of one username.
#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    last_attempt: Instant,
}

/// Locks a username out after too many consecutive failed logins.
///
/// The counter resets on a successful login, or once `lockout` has elapsed
/// since the last failure. Counters past that window are purged on every
/// recorded failure.
#[derive(Debug, Clone)]
pub struct LoginGuard {
    inner: Arc<Mutex<HashMap<String, Attempts>>>,
    max_attempts: u32,
    lockout: Duration,
}

impl LoginGuard {
    pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(15 * 60);

    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_attempts,
            lockout,
        }
    }

    /// `Err(Locked)` while `username` is locked out.
    pub fn check(&self, username: &str) -> Result<(), AuthError> {
        let now = Instant::now();
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let Some(attempts) = inner.get(username).copied() else {
            return Ok(());
        };
        let elapsed = now.duration_since(attempts.last_attempt);
        if elapsed > self.lockout {
            inner.remove(username);
            return Ok(());
        }
        if attempts.count >= self.max_attempts {
            return Err(AuthError::Locked {
                remaining: self.lockout.saturating_sub(elapsed),
            });
        }
        Ok(())
    }

    /// Counts a failure and returns the number of consecutive failures.
    pub fn record_failure(&self, username: &str) -> u32 {
        let now = Instant::now();
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let lockout = self.lockout;
        inner.retain(|_, attempts| now.duration_since(attempts.last_attempt) <= lockout);
        let attempts = inner.entry(username.to_string()).or_insert(Attempts {
            count: 0,
            last_attempt: now,
        });
        attempts.count += 1;
        attempts.last_attempt = now;
        attempts.count
    }

    pub fn record_success(&self, username: &str) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.remove(username);
    }
}
