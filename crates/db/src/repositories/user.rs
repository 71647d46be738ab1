use chrono::Utc;
use sqlx::Row;

use shiftbot_core::domain::user::{User, UserToken};

use super::{decode_utc, RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let token: String =
        row.try_get("user_token").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let nickname: String =
        row.try_get("nickname").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User { token: UserToken(token), nickname, created_at: decode_utc(&created_at_str)? })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find(&self, token: &UserToken) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_token, nickname, created_at FROM users WHERE user_token = ?",
        )
        .bind(&token.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn register(&self, token: &UserToken, nickname: &str) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users (user_token, nickname, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(user_token) DO UPDATE SET nickname = excluded.nickname",
        )
        .bind(&token.0)
        .bind(nickname)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.find(token).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("user `{token}` missing after upsert"))
        })
    }

    async fn ensure(&self, token: &UserToken) -> Result<User, RepositoryError> {
        if let Some(user) = self.find(token).await? {
            return Ok(user);
        }

        sqlx::query(
            "INSERT INTO users (user_token, nickname, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(user_token) DO NOTHING",
        )
        .bind(&token.0)
        .bind(token.placeholder_nickname())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.find(token).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("user `{token}` missing after insert"))
        })
    }
}
