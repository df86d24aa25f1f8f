use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    errors::DbError,
    models::{NewPlayer, NewTeam, NewUser, Player, Team, TeamDetail, User},
};

/// Repository Trait
///
/// The abstract contract for every persistence operation the handlers perform. Handlers
/// only see `Arc<dyn Repository>`, so tests can swap in `InMemoryRepository`.
///
/// Every statement is parameterized. Ownership rules live in the WHERE clauses; delete
/// operations report the affected-row count and leave interpretation to the caller.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Teams ---
    async fn list_teams(&self) -> Result<Vec<Team>, DbError>;
    // Exact code match, joined with the manager's account.
    async fn get_team(&self, code: &str) -> Result<Option<TeamDetail>, DbError>;
    async fn create_team(&self, team: NewTeam) -> Result<(), DbError>;
    // Owner-Only: deletes only when `manager` matches.
    async fn delete_team(&self, code: &str, manager: i64) -> Result<u64, DbError>;

    // --- Players ---
    async fn list_players(&self, team: &str) -> Result<Vec<Player>, DbError>;
    async fn create_player(&self, player: NewPlayer) -> Result<(), DbError>;
    async fn delete_player(&self, id: i64, team: &str) -> Result<u64, DbError>;

    // --- Users ---
    // Exact, case-sensitive match.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError>;
    async fn create_user(&self, user: NewUser) -> Result<User, DbError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Each operation checks a connection out of the pool
/// for its own duration only; the `PoolConnection` guard hands it back on drop, whichever
/// way the operation exits.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_teams(&self) -> Result<Vec<Team>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let teams = sqlx::query_as::<_, Team>(
            "SELECT code, name, description, website, manager FROM teams ORDER BY code",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(teams)
    }

    /// get_team
    ///
    /// Joins the team with its manager so the detail page can show who owns it.
    async fn get_team(&self, code: &str) -> Result<Option<TeamDetail>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let team = sqlx::query_as::<_, TeamDetail>(
            r#"
            SELECT teams.code,
                   teams.name,
                   teams.description,
                   teams.website,
                   teams.manager,
                   users.username AS manager_username
            FROM teams
            JOIN users ON teams.manager = users.id
            WHERE teams.code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(team)
    }

    /// create_team
    ///
    /// No pre-check for an existing code: the primary key rejects duplicates and the
    /// violation comes back as `DbError::UniqueViolation`.
    async fn create_team(&self, team: NewTeam) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(
            "INSERT INTO teams (code, name, description, website, manager) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&team.code)
        .bind(&team.name)
        .bind(&team.description)
        .bind(&team.website)
        .bind(team.manager)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn delete_team(&self, code: &str, manager: i64) -> Result<u64, DbError> {
        let mut conn = self.pool.acquire().await?;
        let res = sqlx::query("DELETE FROM teams WHERE code = $1 AND manager = $2")
            .bind(code)
            .bind(manager)
            .execute(&mut *conn)
            .await?;
        Ok(res.rows_affected())
    }

    async fn list_players(&self, team: &str) -> Result<Vec<Player>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let players = sqlx::query_as::<_, Player>(
            "SELECT id, name, notes, team FROM players WHERE team = $1 ORDER BY id",
        )
        .bind(team)
        .fetch_all(&mut *conn)
        .await?;
        Ok(players)
    }

    async fn create_player(&self, player: NewPlayer) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("INSERT INTO players (name, notes, team) VALUES ($1, $2, $3)")
            .bind(&player.name)
            .bind(&player.notes)
            .bind(&player.team)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn delete_player(&self, id: i64, team: &str) -> Result<u64, DbError> {
        let mut conn = self.pool.acquire().await?;
        let res = sqlx::query("DELETE FROM players WHERE id = $1 AND team = $2")
            .bind(id)
            .bind(team)
            .execute(&mut *conn)
            .await?;
        Ok(res.rows_affected())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DbError> {
        let mut conn = self.pool.acquire().await?;
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, username, password_hash) VALUES ($1, $2, $3)
            RETURNING id, name, username, password_hash
            "#,
        )
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&mut *conn)
        .await?;
        Ok(created)
    }
}

/// InMemoryRepository
///
/// A `Repository` kept in process memory, used by the test suite and for running the
/// server without a database. It enforces the same keys and constraints as the SQL
/// schema: unique usernames and team codes, foreign keys from teams to users and from
/// players to teams, and cascading player removal when a team goes.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    teams: Vec<Team>,
    players: Vec<Player>,
    next_user_id: i64,
    next_player_id: i64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every stored team, for assertions.
    pub fn teams(&self) -> Vec<Team> {
        self.tables().teams.clone()
    }

    /// Snapshot of every stored player, for assertions.
    pub fn players(&self) -> Vec<Player> {
        self.tables().players.clone()
    }

    pub fn user_count(&self) -> usize {
        self.tables().users.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_teams(&self) -> Result<Vec<Team>, DbError> {
        let mut teams = self.tables().teams.clone();
        teams.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(teams)
    }

    async fn get_team(&self, code: &str) -> Result<Option<TeamDetail>, DbError> {
        let tables = self.tables();
        let detail = tables.teams.iter().find(|t| t.code == code).and_then(|team| {
            tables
                .users
                .iter()
                .find(|u| u.id == team.manager)
                .map(|manager| TeamDetail {
                    code: team.code.clone(),
                    name: team.name.clone(),
                    description: team.description.clone(),
                    website: team.website.clone(),
                    manager: team.manager,
                    manager_username: manager.username.clone(),
                })
        });
        Ok(detail)
    }

    async fn create_team(&self, team: NewTeam) -> Result<(), DbError> {
        let mut tables = self.tables();
        if tables.teams.iter().any(|t| t.code == team.code) {
            return Err(DbError::UniqueViolation {
                constraint: Some("teams_pkey".to_string()),
            });
        }
        if !tables.users.iter().any(|u| u.id == team.manager) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("teams_manager_fkey".to_string()),
            });
        }
        tables.teams.push(Team {
            code: team.code,
            name: team.name,
            description: team.description,
            website: team.website,
            manager: team.manager,
        });
        Ok(())
    }

    async fn delete_team(&self, code: &str, manager: i64) -> Result<u64, DbError> {
        let mut tables = self.tables();
        let before = tables.teams.len();
        tables.teams.retain(|t| !(t.code == code && t.manager == manager));
        let removed = (before - tables.teams.len()) as u64;
        if removed > 0 {
            tables.players.retain(|p| p.team != code);
        }
        Ok(removed)
    }

    async fn list_players(&self, team: &str) -> Result<Vec<Player>, DbError> {
        Ok(self
            .tables()
            .players
            .iter()
            .filter(|p| p.team == team)
            .cloned()
            .collect())
    }

    async fn create_player(&self, player: NewPlayer) -> Result<(), DbError> {
        let mut tables = self.tables();
        if !tables.teams.iter().any(|t| t.code == player.team) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("players_team_fkey".to_string()),
            });
        }
        tables.next_player_id += 1;
        let id = tables.next_player_id;
        tables.players.push(Player {
            id,
            name: player.name,
            notes: player.notes,
            team: player.team,
        });
        Ok(())
    }

    async fn delete_player(&self, id: i64, team: &str) -> Result<u64, DbError> {
        let mut tables = self.tables();
        let before = tables.players.len();
        tables.players.retain(|p| !(p.id == id && p.team == team));
        Ok((before - tables.players.len()) as u64)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DbError> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(DbError::UniqueViolation {
                constraint: Some("users_username_key".to_string()),
            });
        }
        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            name: user.name,
            username: user.username,
            password_hash: user.password_hash,
        };
        tables.users.push(created.clone());
        Ok(created)
    }
}
