use crate::error::AuthError;
use crate::user::{AuthProvider, Profile, User};
use chrono::Utc;
use configuration::EntraSettings;
use serde::Deserialize;

/// The subset of the Microsoft Graph `/me` response used to build a user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrosoftProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_principal_name: String,
    pub mail: Option<String>,
    #[serde(default)]
    pub display_name: String,
    pub job_title: Option<String>,
}

impl MicrosoftProfile {
    /// `mail` when set, otherwise the principal name.
    pub fn email(&self) -> &str {
        match self.mail.as_deref() {
            Some(mail) if !mail.is_empty() => mail,
            _ => &self.user_principal_name,
        }
    }
}

/// Maps a Microsoft identity onto a dashboard profile.
pub fn determine_profile(profile: &MicrosoftProfile) -> Profile {
    let email = profile.email().to_lowercase();
    let display_name = profile.display_name.to_lowercase();
    let job_title = profile.job_title.as_deref().unwrap_or_default().to_lowercase();

    let mentions = |text: &str, terms: &[&str]| terms.iter().any(|t| text.contains(t));

    if mentions(&email, &["admin", "administrator"]) || mentions(&display_name, &["admin", "administrator"]) {
        Profile::Admin
    } else if mentions(&job_title, &["diretor", "director", "gerente", "manager"]) {
        Profile::Gestor
    } else if mentions(&job_title, &["analista", "analyst"]) {
        Profile::Analista
    } else {
        Profile::Viewer
    }
}

/// Builds a user from a Microsoft profile, rejecting e-mail domains outside
/// `authorized_domains` when that list is configured.
pub fn user_from_microsoft(
    profile: &MicrosoftProfile,
    settings: &EntraSettings,
) -> Result<User, AuthError> {
    let email = profile.email();
    let allowed = settings.authorized_domains();
    if !allowed.is_empty() {
        let domain = email
            .split_once('@')
            .map(|(_, domain)| domain.to_lowercase())
            .unwrap_or_default();
        if !allowed.contains(&domain) {
            tracing::warn!(domain = %domain, "Unauthorized e-mail domain.");
            return Err(AuthError::UnauthorizedDomain(domain));
        }
    }

    let user = User {
        id: profile.id.clone(),
        username: profile.user_principal_name.clone(),
        email: email.to_string(),
        full_name: profile.display_name.clone(),
        profile: determine_profile(profile),
        active: true,
        provider: AuthProvider::Microsoft,
        session_id: None,
        last_login: Some(Utc::now()),
    };
    tracing::info!(email = %user.email, profile = %user.profile, "Microsoft user signed in.");
    Ok(user)
}
