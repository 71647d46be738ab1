use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use shiftbot_core::domain::admin::Admin;
use shiftbot_core::domain::claim::{
    AdmissionOutcome, CancelOutcome, ClaimId, ClaimWithSlot, Claimant,
};
use shiftbot_core::domain::slot::{
    CapacityOutcome, DeleteOutcome, RegisterOutcome, RescheduleOutcome, Slot, SlotId,
};
use shiftbot_core::domain::user::{User, UserToken};
use shiftbot_core::pagination::Page;

pub mod admin;
pub mod claim;
pub mod slot;
pub mod user;

pub use admin::SqlAdminRepository;
pub use claim::SqlClaimRepository;
pub use slot::SqlSlotRepository;
pub use user::SqlUserRepository;

/// Slot instants are stored as naive local text so that `BETWEEN` and `>=`
/// comparisons on the column sort chronologically.
pub const SLOT_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// True for SQLITE_BUSY / SQLITE_LOCKED failures, the only class a
    /// caller may retry.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => {
                let code_is_busy = db
                    .code()
                    .map(|code| {
                        matches!(code.as_ref(), "5" | "6" | "261" | "262" | "517")
                    })
                    .unwrap_or(false);
                code_is_busy || db.message().contains("database is locked")
            }
            _ => false,
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Run `op` up to `max_attempts` times, sleeping `backoff` between attempts,
/// retrying only busy-class failures.
pub async fn with_busy_retry<T, F, Fut>(
    max_attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(err) if err.is_busy() && attempt < max_attempts.max(1) => {
                tokio::time::sleep(backoff).await;
            }
            other => return other,
        }
    }
}

pub(crate) fn encode_slot_at(at: NaiveDateTime) -> String {
    at.format(SLOT_AT_FORMAT).to_string()
}

pub(crate) fn decode_slot_at(raw: &str) -> Result<NaiveDateTime, RepositoryError> {
    NaiveDateTime::parse_from_str(raw, SLOT_AT_FORMAT)
        .map_err(|err| RepositoryError::Decode(format!("bad slot_at `{raw}`: {err}")))
}

pub(crate) fn decode_utc(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Decode(format!("bad timestamp `{raw}`: {err}")))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    AlreadyAdmin,
    UserNotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    NotAnAdmin,
    ProtectedSuperAdmin,
    SelfRemoval,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, token: &UserToken) -> Result<Option<User>, RepositoryError>;

    /// Insert or rename. Welcome flow entry point.
    async fn register(&self, token: &UserToken, nickname: &str) -> Result<User, RepositoryError>;

    /// Ensure a row exists, assigning a placeholder nickname when the user
    /// never passed through the welcome flow.
    async fn ensure(&self, token: &UserToken) -> Result<User, RepositoryError>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn find(&self, token: &UserToken) -> Result<Option<Admin>, RepositoryError>;
    async fn is_admin(&self, token: &UserToken) -> Result<bool, RepositoryError>;
    async fn list(&self) -> Result<Vec<Admin>, RepositoryError>;

    async fn grant(
        &self,
        actor: &UserToken,
        target: &UserToken,
    ) -> Result<GrantOutcome, RepositoryError>;

    async fn revoke(
        &self,
        actor: &UserToken,
        target: &UserToken,
    ) -> Result<RevokeOutcome, RepositoryError>;
}

#[async_trait]
pub trait SlotRepository: Send + Sync {
    async fn find_by_id(&self, id: SlotId) -> Result<Option<Slot>, RepositoryError>;
    async fn find_exact(&self, at: NaiveDateTime) -> Result<Option<Slot>, RepositoryError>;

    /// Slots inside the half-open window `[start, end)`.
    async fn find_in_window(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Slot>, RepositoryError>;

    async fn register(
        &self,
        at: NaiveDateTime,
        duration_minutes: u32,
        capacity: u32,
    ) -> Result<RegisterOutcome, RepositoryError>;

    async fn reschedule(
        &self,
        id: SlotId,
        new_at: NaiveDateTime,
    ) -> Result<RescheduleOutcome, RepositoryError>;

    async fn set_capacity(
        &self,
        id: SlotId,
        capacity: u32,
    ) -> Result<CapacityOutcome, RepositoryError>;

    async fn delete(&self, id: SlotId) -> Result<DeleteOutcome, RepositoryError>;

    async fn list_upcoming(&self, from: NaiveDateTime) -> Result<Vec<Slot>, RepositoryError>;
}

#[async_trait]
pub trait ClaimRepository: Send + Sync {
    /// One atomic admission attempt. The capacity check and the counter
    /// increment commit together or not at all.
    async fn try_claim(
        &self,
        user: &UserToken,
        slot_id: SlotId,
    ) -> Result<AdmissionOutcome, RepositoryError>;

    async fn cancel(
        &self,
        user: &UserToken,
        claim_id: ClaimId,
    ) -> Result<CancelOutcome, RepositoryError>;

    async fn list_user_claims(
        &self,
        user: &UserToken,
        from: NaiveDateTime,
        page: u32,
        page_size: u32,
    ) -> Result<Page<ClaimWithSlot>, RepositoryError>;

    async fn list_slot_claimants(
        &self,
        slot_id: SlotId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Claimant>, RepositoryError>;
}
