use std::time::Duration;

use auth::{AuthError, AuthProvider, AuthService, MicrosoftProfile, Profile};
use configuration::{EntraSettings, SecuritySettings};

fn security() -> SecuritySettings {
    SecuritySettings {
        secret_key: "test-key".to_string(),
        session_timeout: 480,
        max_login_attempts: 5,
    }
}

fn entra(enabled: bool) -> EntraSettings {
    EntraSettings {
        enabled,
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "https://painel.example/auth".to_string(),
        metadata_url: "https://login.example/.well-known/openid-configuration".to_string(),
        authorized_domains: "corp.example".to_string(),
        cookie_secret: "cookie".to_string(),
    }
}

#[test]
fn demo_users_log_in_with_their_profiles() {
    let service = AuthService::new(&security()).expect("service should build");

    for (username, password, profile) in [
        ("admin", "admin123", Profile::Admin),
        ("gestor", "gestor123", Profile::Gestor),
        ("usuario", "usuario123", Profile::Viewer),
    ] {
        let (session_id, user) = service
            .login(username, password)
            .expect("demo login should succeed");
        assert_eq!(user.profile, profile);
        assert_eq!(user.provider, AuthProvider::Demo);

        let current = service.session(&session_id).expect("session should resolve");
        assert_eq!(current.username, username);
    }
    assert_eq!(service.active_sessions(), 3);
}

#[test]
fn wrong_and_empty_credentials_are_rejected() {
    let service = AuthService::new(&security()).expect("service should build");

    assert_eq!(
        service.authenticate("admin", "wrong").unwrap_err(),
        AuthError::InvalidCredentials
    );
    assert_eq!(
        service.authenticate("   ", "admin123").unwrap_err(),
        AuthError::EmptyCredentials
    );
    assert_eq!(
        service.authenticate("admin", "").unwrap_err(),
        AuthError::EmptyCredentials
    );
}

#[test]
fn five_failures_lock_the_username() {
    let service = AuthService::new(&security()).expect("service should build");

    for _ in 0..5 {
        assert_eq!(
            service.authenticate("gestor", "nope").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    // Even the right password is refused while locked.
    let err = service.authenticate("gestor", "gestor123").unwrap_err();
    match &err {
        AuthError::Locked { remaining } => {
            assert!(*remaining <= Duration::from_secs(15 * 60));
            assert!(err.to_string().contains("15 minutes"));
        }
        other => panic!("expected a lockout, got {other:?}"),
    }

    // Other accounts keep working.
    assert!(service.authenticate("admin", "admin123").is_ok());
}

#[test]
fn lockout_lifts_after_its_window() {
    let service = AuthService::with_lockout(&security(), Duration::from_millis(200))
        .expect("service should build");
    for _ in 0..5 {
        let _ = service.authenticate("usuario", "nope");
    }
    assert!(matches!(
        service.authenticate("usuario", "usuario123"),
        Err(AuthError::Locked { .. })
    ));

    std::thread::sleep(Duration::from_millis(300));
    assert!(service.authenticate("usuario", "usuario123").is_ok());
}

#[test]
fn logout_ends_the_session() {
    let service = AuthService::new(&security()).expect("service should build");
    let (session_id, _) = service.login("admin", "admin123").expect("login");

    service.logout(&session_id);
    assert!(service.session(&session_id).is_none());
}

#[test]
fn microsoft_login_requires_enabled_entra() {
    let service = AuthService::new(&security()).expect("service should build");
    let profile = MicrosoftProfile {
        id: "abc".to_string(),
        user_principal_name: "carla@corp.example".to_string(),
        mail: Some("carla@corp.example".to_string()),
        display_name: "Carla".to_string(),
        job_title: Some("Manager".to_string()),
    };

    assert_eq!(
        service.login_microsoft(&profile, &entra(false)).unwrap_err(),
        AuthError::EntraDisabled
    );

    let (session_id, user) = service
        .login_microsoft(&profile, &entra(true))
        .expect("microsoft login should succeed");
    assert_eq!(user.profile, Profile::Gestor);
    assert_eq!(user.provider, AuthProvider::Microsoft);
    assert!(service.session(&session_id).is_some());
}
