use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;
use team_roster::{
    AppState, InMemoryRepository,
    auth::AuthUser,
    config::AppConfig,
    models::User,
    password::{hash_password, verify_password},
    repository::RepositoryState,
    session::{FlashKind, MAX_FLASHES, SESSION_COOKIE, Session},
};

// --- Helpers ---

fn test_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
        config: AppConfig::default(),
    }
}

fn test_user(id: i64) -> User {
    User {
        id,
        name: "Ada Lovelace".to_string(),
        username: "ada".to_string(),
        password_hash: String::new(),
    }
}

fn cookie_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={token}")).unwrap(),
    );
    headers
}

async fn extract_auth_user(token: Option<&str>) -> Result<AuthUser, axum::response::Response> {
    let state = test_state();
    let mut builder = Request::builder().uri("/add-team");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
    }
    let (mut parts, _) = builder.body(()).unwrap().into_parts();

    AuthUser::from_request_parts(&mut parts, &state)
        .await
        .map_err(IntoResponse::into_response)
}

// --- Password Hashing ---

#[test]
fn test_password_hash_round_trip() {
    let hash = hash_password("correct horse").unwrap();

    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_password("correct horse", &hash).unwrap());
    assert!(!verify_password("wrong horse", &hash).unwrap());
}

#[test]
fn test_password_hashes_are_salted() {
    let first = hash_password("same").unwrap();
    let second = hash_password("same").unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_verify_rejects_malformed_stored_hash() {
    assert!(verify_password("anything", "not-a-phc-string").is_err());
}

// --- Session Cookie ---

#[test]
fn test_session_survives_cookie_round_trip() {
    let config = AppConfig::default();
    let mut session = Session::default();
    session.login(&test_user(7));
    session.success("Login successful");

    let token = session.encode(&config).unwrap();
    let decoded = Session::from_headers(&cookie_headers(&token), &config);

    assert_eq!(decoded, session);
    assert_eq!(decoded.authenticated_user(), Some(7));
    assert_eq!(decoded.user_name.as_deref(), Some("Ada Lovelace"));
}

#[test]
fn test_missing_cookie_is_anonymous() {
    let session = Session::from_headers(&HeaderMap::new(), &AppConfig::default());
    assert_eq!(session, Session::default());
    assert_eq!(session.authenticated_user(), None);
}

#[test]
fn test_tampered_cookie_is_anonymous() {
    let config = AppConfig::default();
    let mut session = Session::default();
    session.login(&test_user(7));
    let token = session.encode(&config).unwrap();

    // Flip the first character of the signature.
    let (signed, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{signed}.{flipped}{}", &signature[1..]);

    let decoded = Session::from_headers(&cookie_headers(&tampered), &config);
    assert_eq!(decoded.authenticated_user(), None);
}

#[test]
fn test_cookie_signed_with_another_secret_is_anonymous() {
    let config = AppConfig::default();
    let other = AppConfig {
        session_secret: "some-other-secret".to_string(),
        ..AppConfig::default()
    };
    let mut session = Session::default();
    session.login(&test_user(7));
    let token = session.encode(&other).unwrap();

    let decoded = Session::from_headers(&cookie_headers(&token), &config);
    assert_eq!(decoded, Session::default());
}

#[test]
fn test_expired_cookie_is_anonymous() {
    let expired = AppConfig {
        session_ttl_secs: -3600,
        ..AppConfig::default()
    };
    let mut session = Session::default();
    session.login(&test_user(7));
    let token = session.encode(&expired).unwrap();

    let decoded = Session::from_headers(&cookie_headers(&token), &AppConfig::default());
    assert_eq!(decoded.authenticated_user(), None);
}

#[test]
fn test_set_cookie_attributes() {
    let local = Session::default().to_cookie(&AppConfig::default()).unwrap();
    assert!(local.starts_with("session="));
    assert!(local.contains("; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800"));
    assert!(!local.contains("Secure"));

    let production = AppConfig {
        cookie_secure: true,
        ..AppConfig::default()
    };
    let hardened = Session::default().to_cookie(&production).unwrap();
    assert!(hardened.ends_with("; Secure"));
}

// --- Session State Machine ---

#[test]
fn test_logout_clears_identity_but_keeps_flashes() {
    let mut session = Session::default();
    session.login(&test_user(7));
    session.success("Logged out successfully");
    session.logout();

    assert_eq!(session.user_id, None);
    assert_eq!(session.user_name, None);
    assert!(!session.logged_in);
    assert_eq!(session.flashes.len(), 1);
}

#[test]
fn test_user_id_without_logged_in_flag_is_anonymous() {
    let session = Session {
        user_id: Some(7),
        ..Session::default()
    };
    assert_eq!(session.authenticated_user(), None);
}

#[test]
fn test_flashes_are_taken_once() {
    let mut session = Session::default();
    session.error("Invalid credentials");

    let flashes = session.take_flashes();
    assert_eq!(flashes.len(), 1);
    assert_eq!(flashes[0].kind, FlashKind::Error);
    assert_eq!(flashes[0].message, "Invalid credentials");
    assert!(session.take_flashes().is_empty());
}

#[test]
fn test_pending_flashes_are_capped_keeping_newest() {
    let config = AppConfig::default();
    let mut session = Session::default();
    for n in 0..20 {
        session.success(format!("notice {n}"));
    }

    assert_eq!(session.flashes.len(), MAX_FLASHES);
    assert_eq!(session.flashes[0].message, format!("notice {}", 20 - MAX_FLASHES));
    assert_eq!(session.flashes[MAX_FLASHES - 1].message, "notice 19");

    // The cookie stays the size of a capped session.
    let mut capped = Session::default();
    for n in 20 - MAX_FLASHES..20 {
        capped.success(format!("notice {n}"));
    }
    assert_eq!(
        session.to_cookie(&config).unwrap().len(),
        capped.to_cookie(&config).unwrap().len()
    );
}

// --- AuthUser Extractor ---

#[tokio::test]
async fn test_auth_user_extracted_from_logged_in_session() {
    let mut session = Session::default();
    session.login(&test_user(9));
    let token = session.encode(&AppConfig::default()).unwrap();

    let user = extract_auth_user(Some(&token)).await.unwrap();
    assert_eq!(
        user,
        AuthUser {
            id: 9,
            name: "Ada Lovelace".to_string()
        }
    );
}

#[tokio::test]
async fn test_auth_user_rejection_redirects_to_login() {
    for token in [None, Some("garbage.token.value")] {
        let response = extract_auth_user(token).await.unwrap_err();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }
}

#[tokio::test]
async fn test_auth_user_rejects_logged_out_session() {
    let mut session = Session::default();
    session.login(&test_user(9));
    session.logout();
    let token = session.encode(&AppConfig::default()).unwrap();

    assert!(extract_auth_user(Some(&token)).await.is_err());
}
