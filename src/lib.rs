use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod sanitize;
pub mod session;
pub mod templates;

// Public and authenticated route tables.
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI description of the routes and form bodies, served as JSON at
/// `/api-docs/openapi.json` with a browser UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::show_all_teams, handlers::show_one_team, handlers::add_a_team,
        handlers::delete_a_team, handlers::add_a_player, handlers::delete_a_player,
        handlers::register_form, handlers::login_form, handlers::add_user,
        handlers::login_user, handlers::logout
    ),
    components(
        schemas(
            models::Team, models::TeamDetail, models::Player,
            models::CreateTeamForm, models::CreatePlayerForm,
            models::RegisterForm, models::LoginForm,
        )
    ),
    tags(
        (name = "team-roster", description = "Team and player roster")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply cloned state handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Immutable configuration, including the session signing secret.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`. Extracting `AuthUser` either succeeds or short-circuits
/// with the extractor's rejection (a redirect to `/login`), so the inner handler never
/// runs for an anonymous request.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, the auth guard, the shared state and the request
/// correlation/tracing layers.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            // Request ID first, so the trace span can pick it up.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span for one HTTP request, keyed by its `x-request-id`. The query string is left out
/// of the span.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
