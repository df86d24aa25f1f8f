//! Runs against a real PostgreSQL database named by `DATABASE_URL`.
//! Ignored by default: `cargo test -- --ignored`.

use chrono::Utc;
use sqlx::PgPool;
use team_roster::{
    errors::DbError,
    models::{NewPlayer, NewTeam, NewUser, User},
    repository::{PostgresRepository, Repository},
};
use tokio::test;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Unique per call, so tests can share one database.
fn unique(prefix: &str) -> String {
    format!(
        "{prefix}{}",
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn create_test_user(repo: &PostgresRepository) -> User {
    repo.create_user(NewUser {
        name: "Test User".to_string(),
        username: unique("user"),
        password_hash: "$argon2id$placeholder".to_string(),
    })
    .await
    .expect("Failed to create test user")
}

fn new_team(code: &str, manager: i64) -> NewTeam {
    NewTeam {
        code: code.to_string(),
        name: "Wolves".to_string(),
        description: "Pack".to_string(),
        website: String::new(),
        manager,
    }
}

// --- Tests ---

#[test]
#[ignore]
async fn test_create_and_get_team_with_manager() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;
    let code = unique("FC");

    repo.create_team(new_team(&code, user.id)).await.unwrap();

    let detail = repo.get_team(&code).await.unwrap().expect("team exists");
    assert_eq!(detail.code, code);
    assert_eq!(detail.manager, user.id);
    assert_eq!(detail.manager_username, user.username);

    assert!(repo.list_teams().await.unwrap().iter().any(|t| t.code == code));
    assert!(repo.get_team(&code.to_lowercase()).await.unwrap().is_none());
}

#[test]
#[ignore]
async fn test_duplicate_team_code_is_unique_violation() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;
    let code = unique("DUP");

    repo.create_team(new_team(&code, user.id)).await.unwrap();
    let err = repo.create_team(new_team(&code, user.id)).await.unwrap_err();

    assert!(matches!(err, DbError::UniqueViolation { .. }));
}

#[test]
#[ignore]
async fn test_delete_team_requires_manager_and_cascades() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let manager = create_test_user(&repo).await;
    let other = create_test_user(&repo).await;
    let code = unique("DEL");

    repo.create_team(new_team(&code, manager.id)).await.unwrap();
    repo.create_player(NewPlayer {
        name: "Keeper".to_string(),
        notes: String::new(),
        team: code.clone(),
    })
    .await
    .unwrap();

    assert_eq!(repo.delete_team(&code, other.id).await.unwrap(), 0);
    assert!(repo.get_team(&code).await.unwrap().is_some());

    assert_eq!(repo.delete_team(&code, manager.id).await.unwrap(), 1);
    assert!(repo.get_team(&code).await.unwrap().is_none());
    assert!(repo.list_players(&code).await.unwrap().is_empty());
}

#[test]
#[ignore]
async fn test_player_lifecycle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;
    let code = unique("PL");
    repo.create_team(new_team(&code, user.id)).await.unwrap();

    repo.create_player(NewPlayer {
        name: "Striker".to_string(),
        notes: "Left foot".to_string(),
        team: code.clone(),
    })
    .await
    .unwrap();

    let players = repo.list_players(&code).await.unwrap();
    assert_eq!(players.len(), 1);
    let id = players[0].id;

    assert_eq!(repo.delete_player(id, "NOT-THIS-TEAM").await.unwrap(), 0);
    assert_eq!(repo.delete_player(id, &code).await.unwrap(), 1);
    assert!(repo.list_players(&code).await.unwrap().is_empty());
}

#[test]
#[ignore]
async fn test_player_for_unknown_team_is_foreign_key_violation() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let err = repo
        .create_player(NewPlayer {
            name: "Ghost".to_string(),
            notes: String::new(),
            team: unique("MISSING"),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
}

#[test]
#[ignore]
async fn test_duplicate_username_is_unique_violation() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    let Err(err) = repo
        .create_user(NewUser {
            name: "Someone Else".to_string(),
            username: user.username.clone(),
            password_hash: "$argon2id$placeholder".to_string(),
        })
        .await
    else {
        panic!("second insert with the same username succeeded");
    };
    assert!(matches!(err, DbError::UniqueViolation { .. }));

    let found = repo
        .find_user_by_username(&user.username)
        .await
        .unwrap()
        .expect("user exists");
    assert_eq!(found.id, user.id);
}
