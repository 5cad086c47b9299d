use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, User},
    repositories::UserStore,
};

const USER_COLUMNS: &str =
    "id, username, email, hashed_password, is_active, is_verified, created_at";

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        hashed_password: row.try_get("hashed_password")?,
        is_active: row.try_get("is_active")?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
    })
}

/// PostgreSQL-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &(dyn ToSql + Sync)) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column),
                &[value],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", &username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", &email).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.find_one("id", &id).await
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    r#"
                    INSERT INTO users (username, email, hashed_password)
                    VALUES ($1, $2, $3)
                    RETURNING {}
                    "#,
                    USER_COLUMNS
                ),
                &[&user.username, &user.email, &user.hashed_password],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::UserExists
                } else {
                    AppError::Database(e)
                }
            })?;

        let user = row_to_user(&row)?;
        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }
}
