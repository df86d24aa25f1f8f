use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Browsing, registration and the login/logout flow. None of these need a session, though
/// they all read one to render navigation and notices.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check; does not touch the database or the session.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Home page: every team, plus the add-team form for logged-in users.
        .route("/", get(handlers::show_all_teams))
        // GET /team/{code}
        // Team detail with manager username and players. Unknown code is a 404.
        .route("/team/{code}", get(handlers::show_one_team))
        // GET /register, POST /add-user
        .route("/register", get(handlers::register_form))
        .route("/add-user", post(handlers::add_user))
        // GET /login, POST /login-user
        .route("/login", get(handlers::login_form))
        .route("/login-user", post(handlers::login_user))
        // GET /logout
        // Clears the identity keys; harmless when already anonymous.
        .route("/logout", get(handlers::logout))
}
