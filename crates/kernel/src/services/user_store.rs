//! User persistence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

/// Persistence collaborator for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user and return the assigned ID.
    async fn insert(&self, user: &User) -> Result<Uuid>;

    /// Check whether a username is taken.
    async fn username_exists(&self, username: &str) -> Result<bool>;
}

/// PostgreSQL-backed user store.
///
/// Expects a `users` table with the columns written by [`insert`]; schema
/// management is done elsewhere.
///
/// [`insert`]: UserStore::insert
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> Result<Uuid> {
        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password, register_ip, register_port,
                               register_reason, status, expired_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.register_ip)
        .bind(user.register_port.map(i32::from))
        .bind(&user.register_reason)
        .bind(user.status.as_i16())
        .bind(user.expired_at)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .context("failed to insert user")?;

        Ok(id)
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .context("failed to check username")?;

        Ok(exists)
    }
}

impl std::fmt::Debug for PgUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUserStore").finish()
    }
}
