use crate::error::AuthError;
use crate::user::{AuthProvider, Profile, User};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::collections::HashMap;

/// The built-in accounts available when no identity provider is configured,
/// as `(username, password, full name, profile)`.
pub const DEMO_CREDENTIALS: &[(&str, &str, &str, Profile)] = &[
    ("admin", "admin123", "Administrador Demo", Profile::Admin),
    ("gestor", "gestor123", "Gestor Demo", Profile::Gestor),
    ("usuario", "usuario123", "Usuário Demo", Profile::Viewer),
];

#[derive(Debug, Clone)]
struct Account {
    password_hash: String,
    user: User,
}

/// In-memory user directory holding the demo accounts.
///
/// Passwords are hashed with argon2 when the directory is built and only the
/// PHC hash strings are kept.
#[derive(Debug, Clone)]
pub struct DemoDirectory {
    accounts: HashMap<String, Account>,
}

impl DemoDirectory {
    pub fn new() -> Result<Self, AuthError> {
        let argon2 = Argon2::default();
        let mut accounts = HashMap::with_capacity(DEMO_CREDENTIALS.len());

        for (index, (username, password, full_name, profile)) in DEMO_CREDENTIALS.iter().enumerate() {
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = argon2
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| AuthError::PasswordHash(e.to_string()))?
                .to_string();

            let user = User {
                id: (index + 1).to_string(),
                username: username.to_string(),
                email: format!("{username}@demo.com"),
                full_name: full_name.to_string(),
                profile: *profile,
                active: true,
                provider: AuthProvider::Demo,
                session_id: None,
                last_login: None,
            };
            accounts.insert(username.to_string(), Account { password_hash, user });
        }

        Ok(Self { accounts })
    }

    /// The user behind `username` when `password` matches its stored hash.
    pub fn verify(&self, username: &str, password: &str) -> Option<User> {
        let account = self.accounts.get(username)?;
        let parsed = match PasswordHash::new(&account.password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(error = %e, username, "Stored password hash is malformed.");
                return None;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .ok()
            .map(|_| account.user.clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
