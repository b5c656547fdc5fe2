use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Access profile of a dashboard user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Admin,
    Gestor,
    Analista,
    Viewer,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Admin => "admin",
            Profile::Gestor => "gestor",
            Profile::Analista => "analista",
            Profile::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a user's identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Demo,
    Microsoft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub profile: Profile,
    pub active: bool,
    pub provider: AuthProvider,
    pub session_id: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_permission(&self, allowed: &[Profile]) -> bool {
        self.active && allowed.contains(&self.profile)
    }

    pub fn to_display(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
