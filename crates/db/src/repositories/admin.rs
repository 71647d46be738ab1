use chrono::Utc;
use sqlx::Row;

use shiftbot_core::domain::admin::Admin;
use shiftbot_core::domain::user::UserToken;

use super::{
    decode_utc, is_unique_violation, AdminRepository, GrantOutcome, RepositoryError, RevokeOutcome,
};
use crate::DbPool;

pub struct SqlAdminRepository {
    pool: DbPool,
}

impl SqlAdminRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_admin(row: &sqlx::sqlite::SqliteRow) -> Result<Admin, RepositoryError> {
    let token: String =
        row.try_get("user_token").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let added_by: String =
        row.try_get("added_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let added_at_str: String =
        row.try_get("added_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Admin { user_token: UserToken(token), added_by, added_at: decode_utc(&added_at_str)? })
}

#[async_trait::async_trait]
impl AdminRepository for SqlAdminRepository {
    async fn find(&self, token: &UserToken) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query("SELECT user_token, added_by, added_at FROM admins WHERE user_token = ?")
            .bind(&token.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_admin(r)?)),
            None => Ok(None),
        }
    }

    async fn is_admin(&self, token: &UserToken) -> Result<bool, RepositoryError> {
        Ok(self.find(token).await?.is_some())
    }

    async fn list(&self) -> Result<Vec<Admin>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query("SELECT user_token, added_by, added_at FROM admins ORDER BY added_at ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_admin).collect::<Result<Vec<_>, _>>()
    }

    async fn grant(
        &self,
        actor: &UserToken,
        target: &UserToken,
    ) -> Result<GrantOutcome, RepositoryError> {
        let target_exists =
            sqlx::query("SELECT 1 AS present FROM users WHERE user_token = ?")
                .bind(&target.0)
                .fetch_optional(&self.pool)
                .await?
                .is_some();
        if !target_exists {
            return Ok(GrantOutcome::UserNotFound);
        }

        let result = sqlx::query("INSERT INTO admins (user_token, added_by, added_at) VALUES (?, ?, ?)")
            .bind(&target.0)
            .bind(&actor.0)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(GrantOutcome::Granted),
            Err(err) if is_unique_violation(&err) => Ok(GrantOutcome::AlreadyAdmin),
            Err(err) => Err(err.into()),
        }
    }

    async fn revoke(
        &self,
        actor: &UserToken,
        target: &UserToken,
    ) -> Result<RevokeOutcome, RepositoryError> {
        if actor == target {
            return Ok(RevokeOutcome::SelfRemoval);
        }

        let admin = match self.find(target).await? {
            Some(admin) => admin,
            None => return Ok(RevokeOutcome::NotAnAdmin),
        };

        // The bootstrap super-admin cannot be removed through this path.
        if admin.is_super_admin() {
            return Ok(RevokeOutcome::ProtectedSuperAdmin);
        }

        sqlx::query("DELETE FROM admins WHERE user_token = ?")
            .bind(&target.0)
            .execute(&self.pool)
            .await?;

        Ok(RevokeOutcome::Revoked)
    }
}
