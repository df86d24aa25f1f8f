use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::sanitize::{escape_html, title_case, upper_case, web_link};

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// An account row from the `users` table. Not `Serialize` or `Debug`, since it carries the
/// password hash.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: i64,
    // Display name, title-cased and HTML-escaped at registration.
    pub name: String,
    // Login key, stored exactly as submitted.
    pub username: String,
    // Argon2 PHC string.
    pub password_hash: String,
}

/// Team
///
/// A row from the `teams` table. `manager` is the owning user's id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default, PartialEq)]
pub struct Team {
    pub code: String,
    pub name: String,
    pub description: String,
    pub website: String,
    pub manager: i64,
}

/// TeamDetail
///
/// A team joined with its manager's account, used by the detail page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct TeamDetail {
    pub code: String,
    pub name: String,
    pub description: String,
    pub website: String,
    pub manager: i64,
    // Loaded via the JOIN on users.
    pub manager_username: String,
}

/// Player
///
/// A row from the `players` table. `team` references `teams.code`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default, PartialEq)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub notes: String,
    pub team: String,
}

// --- Insert Records (already normalized) ---

pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTeam {
    pub code: String,
    pub name: String,
    pub description: String,
    pub website: String,
    pub manager: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayer {
    pub name: String,
    pub notes: String,
    pub team: String,
}

// --- Form Payloads (Input Schemas) ---

/// RegisterForm
///
/// Fields posted by the registration page (POST /add-user). No `Debug`, the raw password
/// is in here.
#[derive(Deserialize, ToSchema)]
pub struct RegisterForm {
    pub name: String,
    pub username: String,
    pub password: String,
}

/// LoginForm
///
/// Fields posted by the login page (POST /login-user).
#[derive(Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// CreateTeamForm
///
/// Fields posted by the add-team form on the home page (POST /add-team).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Default)]
pub struct CreateTeamForm {
    pub name: String,
    pub code: String,
    pub description: String,
    pub website: String,
}

impl CreateTeamForm {
    /// Applies the case rules, escapes every field and stamps the manager. A website that
    /// is not an http(s) URL is dropped.
    pub fn normalize(self, manager: i64) -> NewTeam {
        NewTeam {
            code: escape_html(&upper_case(&self.code)),
            name: escape_html(&title_case(&self.name)),
            description: escape_html(&self.description),
            website: escape_html(&web_link(&self.website)),
            manager,
        }
    }
}

/// CreatePlayerForm
///
/// Fields posted by the add-player form on a team page (POST /add-player).
/// `team` carries the owning team's code.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Default)]
pub struct CreatePlayerForm {
    pub name: String,
    pub note: String,
    pub team: String,
}

impl CreatePlayerForm {
    pub fn normalize(self) -> NewPlayer {
        NewPlayer {
            name: escape_html(&title_case(&self.name)),
            notes: escape_html(&self.note),
            team: escape_html(&self.team),
        }
    }
}

impl RegisterForm {
    /// Display name as stored: title-cased, then escaped. The username is left untouched.
    pub fn display_name(&self) -> String {
        escape_html(&title_case(&self.name))
    }
}
