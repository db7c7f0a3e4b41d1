use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;

use super::{is_duplicate_email, now_unix, ModelError};
use crate::auth::Credentials;

/// A user account as exposed to handlers. The password digest never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: i64,
    pub active: bool,
}

impl User {
    pub fn created(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.created_at).ok()
    }
}

/// User persistence and authentication as seen by the handlers.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Hash `password` and persist a new active user. Fails with `DuplicateEmail` when the email
    /// is already registered.
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError>;

    /// Resolve an active user by email and password. Unknown emails and wrong passwords both
    /// yield `InvalidCredentials`.
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError>;

    async fn get(&self, id: i64) -> Result<User, ModelError>;

    /// Replace the password of `id` after verifying `current`.
    async fn change_password(
        &self,
        id: i64,
        current: &str,
        new_password: &str,
    ) -> Result<(), ModelError>;
}

#[derive(sqlx::FromRow)]
struct PasswordRow {
    id: i64,
    hashed_password: String,
}

pub struct SqliteUserStore {
    pool: SqlitePool,
    credentials: Arc<Credentials>,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool, credentials: Arc<Credentials>) -> Self {
        Self { pool, credentials }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        let hashed_password = self.credentials.hash(password).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, hashed_password, created_at, active)
            VALUES (?, ?, ?, ?, 1)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&hashed_password)
        .bind(now_unix())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                info!(target: "users", user_id = done.last_insert_rowid(), "user created");
                Ok(())
            }
            Err(err) if is_duplicate_email(&err) => Err(ModelError::DuplicateEmail),
            Err(err) => Err(ModelError::Store(err)),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError> {
        let row = sqlx::query_as::<_, PasswordRow>(
            r#"
            SELECT id, hashed_password
            FROM users
            WHERE email = ? AND active = 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            self.credentials.verify_dummy(password).await?;
            return Err(ModelError::InvalidCredentials);
        };

        if self
            .credentials
            .verify(&row.hashed_password, password)
            .await?
        {
            Ok(row.id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn get(&self, id: i64) -> Result<User, ModelError> {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at, active
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(ModelError::NotFound)
    }

    async fn change_password(
        &self,
        id: i64,
        current: &str,
        new_password: &str,
    ) -> Result<(), ModelError> {
        let row = sqlx::query_as::<_, PasswordRow>(
            "SELECT id, hashed_password FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ModelError::NotFound)?;

        if !self
            .credentials
            .verify(&row.hashed_password, current)
            .await?
        {
            return Err(ModelError::InvalidCredentials);
        }

        let new_hash = self.credentials.hash(new_password).await?;
        sqlx::query("UPDATE users SET hashed_password = ? WHERE id = ?")
            .bind(&new_hash)
            .bind(row.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
