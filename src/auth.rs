use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};

use crate::{config::AppConfig, session::Session};

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Guarded handlers take this as an
/// argument, so the user's id is guaranteed present before their body runs.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
}

/// AuthUser Extractor Implementation
///
/// Reads the signed session cookie and accepts it only in the Authenticated state
/// (`logged_in` set and a `user_id` present).
///
/// Rejection: a redirect to the login form. Nothing is written to the session and the
/// wrapped handler never runs.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let session = Session::from_headers(&parts.headers, &config);

        let Some(id) = session.authenticated_user() else {
            tracing::debug!(uri = %parts.uri, "guarded route hit without a session");
            return Err(Redirect::to(LOGIN_PATH));
        };

        Ok(AuthUser {
            id,
            name: session.user_name.unwrap_or_default(),
        })
    }
}
