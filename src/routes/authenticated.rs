use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route that mutates teams or players. The guard layer sits above this router, and
/// each handler also takes `AuthUser` directly for the requester's id.
///
/// The delete routes are plain GETs because the pages link to them.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /add-team
        // Creates a team managed by the requester.
        .route("/add-team", post(handlers::add_a_team))
        // GET /delete-team/{code}
        // Owner-Only: the manager id is part of the DELETE's WHERE clause.
        .route("/delete-team/{code}", get(handlers::delete_a_team))
        // POST /add-player
        .route("/add-player", post(handlers::add_a_player))
        // GET /delete-player/{code}/{id}
        // Matches on both id and team; any logged-in user may remove a player.
        .route("/delete-player/{code}/{id}", get(handlers::delete_a_player))
}
