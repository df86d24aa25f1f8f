use axum::{
    Form,
    extract::{Path, State},
    response::{Html, Response},
};
use minijinja::context;

use crate::{
    AppState,
    auth::{AuthUser, LOGIN_PATH},
    errors::{AppError, DbError},
    models::{CreatePlayerForm, CreateTeamForm, LoginForm, NewUser, RegisterForm},
    password,
    sanitize::{encode_path_segment, escape_html},
    session::Session,
    templates::{self, Layout},
};

/// Shown for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub const USERNAME_TAKEN: &str = "Username already exists. Try again...";

/// `/team/<code>` with the code as a single encoded path segment.
fn team_location(code: &str) -> String {
    format!("/team/{}", encode_path_segment(code))
}

// --- Team Handlers ---

/// show_all_teams
///
/// [Public Route] Lists every team.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Home page listing all teams", content_type = "text/html"))
)]
pub async fn show_all_teams(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let teams = state.repo.list_teams().await?;

    let layout = Layout::from_session(&mut session);
    let page = templates::render("pages/home.jinja", &layout, context! { teams => teams })?;
    session.respond(&state.config, Html(page))
}

/// show_one_team
///
/// [Public Route] Shows one team, its manager and its players. An unknown code ends in the
/// 404 page before anything else is loaded.
#[utoipa::path(
    get,
    path = "/team/{code}",
    params(("code" = String, Path, description = "Team code, exact match")),
    responses(
        (status = 200, description = "Team page", content_type = "text/html"),
        (status = 404, description = "No such team")
    )
)]
pub async fn show_one_team(
    State(state): State<AppState>,
    Path(code): Path<String>,
    mut session: Session,
) -> Result<Response, AppError> {
    let team = state
        .repo
        .get_team(&code)
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource: "Team",
            id: code.clone(),
        })?;

    let players = state.repo.list_players(&code).await?;

    let layout = Layout::from_session(&mut session);
    let page = templates::render(
        "pages/team.jinja",
        &layout,
        context! { team => team, players => players },
    )?;
    session.respond(&state.config, Html(page))
}

/// add_a_team
///
/// [Authenticated Route] Creates a team owned by the requesting user.
///
/// A code that is already taken is reported back as a notice instead of an error page.
#[utoipa::path(
    post,
    path = "/add-team",
    request_body(content = CreateTeamForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the home page"))
)]
pub async fn add_a_team(
    State(state): State<AppState>,
    AuthUser { id, .. }: AuthUser,
    mut session: Session,
    Form(form): Form<CreateTeamForm>,
) -> Result<Response, AppError> {
    let team = form.normalize(id);
    let code = team.code.clone();
    let name = team.name.clone();

    match state.repo.create_team(team).await {
        Ok(()) => {
            tracing::info!(code = %code, manager = id, "team created");
            session.success(format!("Team '{name}' added"));
        }
        Err(DbError::UniqueViolation { .. }) => {
            tracing::info!(code = %code, manager = id, "team code already taken");
            session.error(format!("Team code '{code}' is already taken"));
        }
        Err(e) => return Err(e.into()),
    }

    session.redirect(&state.config, "/")
}

/// delete_a_team
///
/// [Authenticated Route] Deletes a team, but only when the requester is its manager.
///
/// *Authorization*: the ownership check is part of the DELETE's WHERE clause. Zero
/// affected rows means the team is missing or belongs to someone else; both are reported
/// with the same notice.
#[utoipa::path(
    get,
    path = "/delete-team/{code}",
    params(("code" = String, Path, description = "Team code")),
    responses((status = 303, description = "Redirect to the home page"))
)]
pub async fn delete_a_team(
    State(state): State<AppState>,
    AuthUser { id, .. }: AuthUser,
    mut session: Session,
    Path(code): Path<String>,
) -> Result<Response, AppError> {
    let deleted = state.repo.delete_team(&code, id).await?;

    if deleted > 0 {
        // Matched a stored code, which is already escaped.
        tracing::info!(code = %code, manager = id, "team deleted");
        session.success(format!("Team {code} deleted"));
    } else {
        tracing::warn!(code = %code, user_id = id, "team delete matched nothing");
        session.error(format!(
            "Team {} not found or not managed by you",
            escape_html(&code)
        ));
    }

    session.redirect(&state.config, "/")
}

// --- Player Handlers ---

/// add_a_player
///
/// [Authenticated Route] Adds a player to a team. Any logged-in user may do this; team
/// existence is left to the foreign key.
#[utoipa::path(
    post,
    path = "/add-player",
    request_body(content = CreatePlayerForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the team page"),
        (status = 400, description = "Unknown team")
    )
)]
pub async fn add_a_player(
    State(state): State<AppState>,
    AuthUser { id, .. }: AuthUser,
    mut session: Session,
    Form(form): Form<CreatePlayerForm>,
) -> Result<Response, AppError> {
    let player = form.normalize();
    let name = player.name.clone();
    let team = player.team.clone();

    state.repo.create_player(player).await?;
    tracing::info!(team = %team, user_id = id, "player added");

    session.success(format!("Player '{name}' added to team {team}"));
    session.redirect(&state.config, &team_location(&team))
}

/// delete_a_player
///
/// [Authenticated Route] Removes a player, matched on both id and team.
#[utoipa::path(
    get,
    path = "/delete-player/{code}/{id}",
    params(
        ("code" = String, Path, description = "Team code"),
        ("id" = i64, Path, description = "Player id")
    ),
    responses((status = 303, description = "Redirect to the team page"))
)]
pub async fn delete_a_player(
    State(state): State<AppState>,
    AuthUser { id: user_id, .. }: AuthUser,
    mut session: Session,
    Path((code, id)): Path<(String, i64)>,
) -> Result<Response, AppError> {
    let deleted = state.repo.delete_player(id, &code).await?;
    let shown = escape_html(&code);

    if deleted > 0 {
        tracing::info!(team = %code, player = id, user_id, "player deleted");
        session.success(format!("Player {id} deleted"));
    } else {
        tracing::warn!(team = %code, player = id, user_id, "player delete matched nothing");
        session.error(format!("Player {id} not found in team {shown}"));
    }

    session.redirect(&state.config, &team_location(&code))
}

// --- Account Handlers ---

#[utoipa::path(
    get,
    path = "/register",
    responses((status = 200, description = "Registration form", content_type = "text/html"))
)]
pub async fn register_form(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let layout = Layout::from_session(&mut session);
    let page = templates::render("pages/register.jinja", &layout, context! {})?;
    session.respond(&state.config, Html(page))
}

#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login form", content_type = "text/html"))
)]
pub async fn login_form(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let layout = Layout::from_session(&mut session);
    let page = templates::render("pages/login.jinja", &layout, context! {})?;
    session.respond(&state.config, Html(page))
}

/// add_user
///
/// [Public Route] Creates an account when the username is free.
///
/// The lookup and the insert are separate statements. A registration that loses a race
/// for the same username hits the unique index and gets the same notice as one that
/// failed the lookup.
#[utoipa::path(
    post,
    path = "/add-user",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /login on success, /register otherwise"))
)]
pub async fn add_user(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if state
        .repo
        .find_user_by_username(&form.username)
        .await?
        .is_some()
    {
        session.error(USERNAME_TAKEN);
        return session.redirect(&state.config, "/register");
    }

    let name = form.display_name();
    let RegisterForm {
        username, password, ..
    } = form;

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| AppError::Password(format!("spawn password hashing task: {e}")))??;

    let new_user = NewUser {
        name,
        username,
        password_hash,
    };

    match state.repo.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, "user registered");
            session.success("Registration successful");
            session.redirect(&state.config, LOGIN_PATH)
        }
        Err(DbError::UniqueViolation { .. }) => {
            session.error(USERNAME_TAKEN);
            session.redirect(&state.config, "/register")
        }
        Err(e) => Err(e.into()),
    }
}

/// login_user
///
/// [Public Route] Authenticates and moves the session to the logged-in state.
///
/// An unknown username and a wrong password end identically, so the response does not
/// reveal which accounts exist.
#[utoipa::path(
    post,
    path = "/login-user",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to / on success, /login otherwise"))
)]
pub async fn login_user(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = state.repo.find_user_by_username(&form.username).await?;

    let verified = match &user {
        Some(user) => {
            // Verify password on a blocking thread to avoid blocking async runtime
            let password = form.password;
            let hash = user.password_hash.clone();
            tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
                .await
                .map_err(|e| AppError::Password(format!("spawn password verification task: {e}")))??
        }
        None => false,
    };

    match user {
        Some(user) if verified => {
            tracing::info!(user_id = user.id, "login succeeded");
            session.login(&user);
            session.success("Login successful");
            session.redirect(&state.config, "/")
        }
        _ => {
            tracing::info!("login rejected");
            session.error(INVALID_CREDENTIALS);
            session.redirect(&state.config, LOGIN_PATH)
        }
    }
}

/// logout
///
/// [Public Route] Clears the identity keys from the session.
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Redirect to the home page"))
)]
pub async fn logout(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    session.logout();
    session.success("Logged out successfully");
    session.redirect(&state.config, "/")
}
