//! # Painel Auth
//!
//! Authentication for the dashboard: the demo user directory with argon2
//! password hashes, a per-username login lockout, in-memory sessions and the
//! mapping of Microsoft Entra profiles onto dashboard users.
//!
//! The OAuth2 redirect and token exchange happen outside this crate; it only
//! receives the Graph `/me` profile once the exchange has succeeded.

pub mod directory;
pub mod entra;
pub mod error;
pub mod guard;
pub mod service;
pub mod session;
pub mod user;

pub use directory::{DemoDirectory, DEMO_CREDENTIALS};
pub use entra::{determine_profile, user_from_microsoft, MicrosoftProfile};
pub use error::AuthError;
pub use guard::LoginGuard;
pub use service::AuthService;
pub use session::SessionStore;
pub use user::{AuthProvider, Profile, User};
