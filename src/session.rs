use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, errors::AppError, models::User};

/// Name of the cookie carrying the signed session.
pub const SESSION_COOKIE: &str = "session";

/// Pending flashes kept per session; older ones are dropped first.
pub const MAX_FLASHES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// A one-shot notice, shown on the next rendered page and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

/// Session
///
/// Per-browser key/value state. It lives entirely in the client's cookie as a signed JWT,
/// so the server keeps nothing between requests. A cookie that fails verification for any
/// reason decodes to the anonymous default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub flashes: Vec<Flash>,
}

#[derive(Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    session: Session,
    iat: i64,
    exp: i64,
}

impl Session {
    /// Reads the session cookie from request headers, falling back to an anonymous session.
    pub fn from_headers(headers: &HeaderMap, config: &AppConfig) -> Self {
        let Some(token) = cookie_value(headers, SESSION_COOKIE) else {
            return Self::default();
        };

        let key = DecodingKey::from_secret(config.session_secret.as_bytes());
        match decode::<SessionClaims>(token, &key, &Validation::default()) {
            Ok(data) => data.claims.session,
            Err(e) => {
                tracing::debug!("discarding unreadable session cookie: {e}");
                Self::default()
            }
        }
    }

    /// Signs the session into a compact token.
    pub fn encode(&self, config: &AppConfig) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            session: self.clone(),
            iat: now,
            exp: now + config.session_ttl_secs,
        };
        let key = EncodingKey::from_secret(config.session_secret.as_bytes());
        Ok(encode(&Header::default(), &claims, &key)?)
    }

    /// Full `Set-Cookie` value for this session.
    pub fn to_cookie(&self, config: &AppConfig) -> Result<String, AppError> {
        let token = self.encode(config)?;
        let secure = if config.cookie_secure { "; Secure" } else { "" };
        Ok(format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}",
            config.session_ttl_secs
        ))
    }

    /// The logged-in user's id, or `None` for an anonymous session.
    pub fn authenticated_user(&self) -> Option<i64> {
        if self.logged_in { self.user_id } else { None }
    }

    /// Anonymous -> Authenticated.
    pub fn login(&mut self, user: &User) {
        self.user_id = Some(user.id);
        self.user_name = Some(user.name.clone());
        self.logged_in = true;
    }

    /// Authenticated -> Anonymous. Pending flashes survive so the next page can show them.
    pub fn logout(&mut self) {
        self.user_id = None;
        self.user_name = None;
        self.logged_in = false;
    }

    pub fn flash(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.flashes.push(Flash {
            kind,
            message: message.into(),
        });
        if self.flashes.len() > MAX_FLASHES {
            let excess = self.flashes.len() - MAX_FLASHES;
            self.flashes.drain(..excess);
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.flash(FlashKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.flash(FlashKind::Error, message);
    }

    /// Drains pending flashes for display.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }

    /// Attaches the re-signed session cookie to `body`.
    pub fn respond(&self, config: &AppConfig, body: impl IntoResponse) -> Result<Response, AppError> {
        let cookie = self.to_cookie(config)?;
        Ok(([(header::SET_COOKIE, cookie)], body).into_response())
    }

    /// 303 redirect to `to`, carrying the session cookie.
    pub fn redirect(&self, config: &AppConfig, to: &str) -> Result<Response, AppError> {
        self.respond(config, Redirect::to(to))
    }
}

/// Finds a cookie by name across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|cookie| {
            cookie
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
        })
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(Session::from_headers(&parts.headers, &config))
    }
}
