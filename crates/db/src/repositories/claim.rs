use chrono::{NaiveDateTime, Utc};
use sqlx::Row;

use shiftbot_core::domain::claim::{
    AdmissionOutcome, CancelOutcome, ClaimId, ClaimWithSlot, Claimant,
};
use shiftbot_core::domain::slot::SlotId;
use shiftbot_core::domain::user::UserToken;
use shiftbot_core::pagination::{self, Page};

use super::{decode_utc, encode_slot_at, is_unique_violation, ClaimRepository, RepositoryError};
use crate::repositories::slot::row_to_slot;
use crate::DbPool;

pub struct SqlClaimRepository {
    pool: DbPool,
}

impl SqlClaimRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_claimant(row: &sqlx::sqlite::SqliteRow) -> Result<Claimant, RepositoryError> {
    let claim_id: i64 =
        row.try_get("claim_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_token: String =
        row.try_get("user_token").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let nickname: String =
        row.try_get("nickname").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let applied_at_str: String =
        row.try_get("applied_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Claimant {
        claim_id: ClaimId(claim_id),
        user_token: UserToken(user_token),
        nickname,
        applied_at: decode_utc(&applied_at_str)?,
    })
}

fn row_to_claim_with_slot(row: &sqlx::sqlite::SqliteRow) -> Result<ClaimWithSlot, RepositoryError> {
    let claim_id: i64 =
        row.try_get("claim_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let applied_at_str: String =
        row.try_get("applied_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ClaimWithSlot {
        claim_id: ClaimId(claim_id),
        applied_at: decode_utc(&applied_at_str)?,
        slot: row_to_slot(row)?,
    })
}

#[async_trait::async_trait]
impl ClaimRepository for SqlClaimRepository {
    async fn try_claim(
        &self,
        user: &UserToken,
        slot_id: SlotId,
    ) -> Result<AdmissionOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let slot_exists = sqlx::query("SELECT 1 AS present FROM slots WHERE id = ?")
            .bind(slot_id.0)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !slot_exists {
            tx.rollback().await?;
            return Ok(AdmissionOutcome::SlotNotFound);
        }

        let insert = sqlx::query("INSERT INTO claims (user_token, slot_id, applied_at) VALUES (?, ?, ?)")
            .bind(&user.0)
            .bind(slot_id.0)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await;

        match insert {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                tx.rollback().await?;
                return Ok(AdmissionOutcome::AlreadyClaimed);
            }
            Err(err) => return Err(err.into()),
        }

        // The seat is taken only if a free seat still exists at commit
        // time. Zero affected rows means the slot filled up underneath us
        // and the whole attempt unwinds, claim row included.
        let admitted = sqlx::query(
            "UPDATE slots SET current_count = current_count + 1
             WHERE id = ? AND current_count < capacity",
        )
        .bind(slot_id.0)
        .execute(&mut *tx)
        .await?;

        if admitted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(AdmissionOutcome::Full);
        }

        let counts = sqlx::query("SELECT current_count, capacity FROM slots WHERE id = ?")
            .bind(slot_id.0)
            .fetch_one(&mut *tx)
            .await?;
        let current_count = counts.get::<i64, _>("current_count").max(0) as u32;
        let capacity = counts.get::<i64, _>("capacity").max(0) as u32;

        tx.commit().await?;
        Ok(AdmissionOutcome::Accepted { current_count, capacity })
    }

    async fn cancel(
        &self,
        user: &UserToken,
        claim_id: ClaimId,
    ) -> Result<CancelOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Ownership is part of the lookup: users can only cancel their own
        // claims.
        let row = sqlx::query("SELECT slot_id FROM claims WHERE id = ? AND user_token = ?")
            .bind(claim_id.0)
            .bind(&user.0)
            .fetch_optional(&mut *tx)
            .await?;

        let slot_id = match row {
            Some(ref r) => r.get::<i64, _>("slot_id"),
            None => {
                tx.rollback().await?;
                return Ok(CancelOutcome::NotFound);
            }
        };

        sqlx::query("DELETE FROM claims WHERE id = ?")
            .bind(claim_id.0)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE slots SET current_count = current_count - 1 WHERE id = ? AND current_count > 0")
            .bind(slot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CancelOutcome::Removed)
    }

    async fn list_user_claims(
        &self,
        user: &UserToken,
        from: NaiveDateTime,
        page: u32,
        page_size: u32,
    ) -> Result<Page<ClaimWithSlot>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT c.id AS claim_id, c.applied_at, s.id AS id, s.slot_at,
                    s.duration_minutes, s.capacity, s.current_count, s.created_at
             FROM claims c
             JOIN slots s ON s.id = c.slot_id
             WHERE c.user_token = ? AND s.slot_at >= ?
             ORDER BY c.applied_at ASC, c.id ASC
             LIMIT ? OFFSET ?",
        )
        .bind(&user.0)
        .bind(encode_slot_at(from))
        .bind(page_size + 1)
        .bind(pagination::offset(page, page_size))
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(row_to_claim_with_slot).collect::<Result<Vec<_>, _>>()?;
        Ok(pagination::from_overfetched(items, page, page_size))
    }

    async fn list_slot_claimants(
        &self,
        slot_id: SlotId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Claimant>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT c.id AS claim_id, c.user_token, u.nickname, c.applied_at
             FROM claims c
             JOIN users u ON u.user_token = c.user_token
             WHERE c.slot_id = ?
             ORDER BY c.applied_at ASC, c.id ASC
             LIMIT ? OFFSET ?",
        )
        .bind(slot_id.0)
        .bind(page_size + 1)
        .bind(pagination::offset(page, page_size))
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(row_to_claimant).collect::<Result<Vec<_>, _>>()?;
        Ok(pagination::from_overfetched(items, page, page_size))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use shiftbot_core::domain::claim::{AdmissionOutcome, CancelOutcome};
    use shiftbot_core::domain::slot::{RegisterOutcome, Slot, SlotId};
    use shiftbot_core::domain::user::UserToken;

    use super::SqlClaimRepository;
    use crate::repositories::{
        ClaimRepository, SlotRepository, SqlSlotRepository, SqlUserRepository, UserRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .expect("valid fixture datetime")
    }

    async fn insert_slot(pool: &sqlx::SqlitePool, when: NaiveDateTime, capacity: u32) -> Slot {
        match SqlSlotRepository::new(pool.clone())
            .register(when, 240, capacity)
            .await
            .expect("register slot")
        {
            RegisterOutcome::Created(slot) => slot,
            RegisterOutcome::DuplicateInstant => panic!("fixture slot already exists"),
        }
    }

    async fn insert_user(pool: &sqlx::SqlitePool, token: &str) -> UserToken {
        let token = UserToken(token.to_string());
        SqlUserRepository::new(pool.clone()).ensure(&token).await.expect("ensure user");
        token
    }

    #[tokio::test]
    async fn admission_fills_seats_then_reports_full() {
        let pool = setup().await;
        let slot = insert_slot(&pool, at(27, 11), 2).await;
        let repo = SqlClaimRepository::new(pool.clone());

        let first = insert_user(&pool, "a").await;
        let second = insert_user(&pool, "b").await;
        let third = insert_user(&pool, "c").await;

        assert_eq!(
            repo.try_claim(&first, slot.id).await.expect("claim a"),
            AdmissionOutcome::Accepted { current_count: 1, capacity: 2 },
        );
        assert_eq!(
            repo.try_claim(&second, slot.id).await.expect("claim b"),
            AdmissionOutcome::Accepted { current_count: 2, capacity: 2 },
        );
        assert_eq!(repo.try_claim(&third, slot.id).await.expect("claim c"), AdmissionOutcome::Full);
    }

    #[tokio::test]
    async fn duplicate_claim_is_rejected_without_consuming_a_seat() {
        let pool = setup().await;
        let slot = insert_slot(&pool, at(27, 11), 2).await;
        let repo = SqlClaimRepository::new(pool.clone());
        let user = insert_user(&pool, "a").await;

        repo.try_claim(&user, slot.id).await.expect("claim");
        assert_eq!(
            repo.try_claim(&user, slot.id).await.expect("reclaim"),
            AdmissionOutcome::AlreadyClaimed,
        );

        let reloaded = SqlSlotRepository::new(pool)
            .find_by_id(slot.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(reloaded.current_count, 1);
    }

    #[tokio::test]
    async fn claim_against_missing_slot_reports_not_found() {
        let pool = setup().await;
        let repo = SqlClaimRepository::new(pool.clone());
        let user = insert_user(&pool, "a").await;

        assert_eq!(
            repo.try_claim(&user, SlotId(9999)).await.expect("claim"),
            AdmissionOutcome::SlotNotFound,
        );
    }

    #[tokio::test]
    async fn cancel_frees_a_seat_for_the_next_claimant() {
        let pool = setup().await;
        let slot = insert_slot(&pool, at(27, 11), 1).await;
        let repo = SqlClaimRepository::new(pool.clone());

        let holder = insert_user(&pool, "a").await;
        let waiter = insert_user(&pool, "b").await;

        repo.try_claim(&holder, slot.id).await.expect("claim");
        assert_eq!(repo.try_claim(&waiter, slot.id).await.expect("claim full"), AdmissionOutcome::Full);

        let mine = repo.list_user_claims(&holder, at(1, 0), 1, 5).await.expect("list");
        let claim_id = mine.items[0].claim_id;

        assert_eq!(repo.cancel(&holder, claim_id).await.expect("cancel"), CancelOutcome::Removed);
        assert_eq!(
            repo.try_claim(&waiter, slot.id).await.expect("claim freed seat"),
            AdmissionOutcome::Accepted { current_count: 1, capacity: 1 },
        );
    }

    #[tokio::test]
    async fn cancel_requires_ownership() {
        let pool = setup().await;
        let slot = insert_slot(&pool, at(27, 11), 2).await;
        let repo = SqlClaimRepository::new(pool.clone());

        let holder = insert_user(&pool, "a").await;
        let stranger = insert_user(&pool, "b").await;

        repo.try_claim(&holder, slot.id).await.expect("claim");
        let mine = repo.list_user_claims(&holder, at(1, 0), 1, 5).await.expect("list");
        let claim_id = mine.items[0].claim_id;

        assert_eq!(
            repo.cancel(&stranger, claim_id).await.expect("cancel other's claim"),
            CancelOutcome::NotFound,
        );
        assert_eq!(repo.cancel(&holder, claim_id).await.expect("cancel own"), CancelOutcome::Removed);
    }

    #[tokio::test]
    async fn user_claim_listing_hides_past_slots() {
        let pool = setup().await;
        let past = insert_slot(&pool, at(20, 9), 3).await;
        let future = insert_slot(&pool, at(27, 11), 3).await;
        let repo = SqlClaimRepository::new(pool.clone());
        let user = insert_user(&pool, "a").await;

        repo.try_claim(&user, past.id).await.expect("claim past");
        repo.try_claim(&user, future.id).await.expect("claim future");

        let page = repo.list_user_claims(&user, at(25, 0), 1, 5).await.expect("list");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slot.id, future.id);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn claimant_roster_pages_are_stable() {
        let pool = setup().await;
        let slot = insert_slot(&pool, at(27, 11), 10).await;
        let repo = SqlClaimRepository::new(pool.clone());

        for i in 0..7 {
            let token = insert_user(&pool, &format!("user-{i}")).await;
            repo.try_claim(&token, slot.id).await.expect("claim");
        }

        let first = repo.list_slot_claimants(slot.id, 1, 5).await.expect("page 1");
        assert_eq!(first.items.len(), 5);
        assert!(!first.has_prev);
        assert!(first.has_next);

        let second = repo.list_slot_claimants(slot.id, 2, 5).await.expect("page 2");
        assert_eq!(second.items.len(), 2);
        assert!(second.has_prev);
        assert!(!second.has_next);

        // Page zero coerces to page one.
        let coerced = repo.list_slot_claimants(slot.id, 0, 5).await.expect("page 0");
        assert_eq!(coerced.items, first.items);

        // Claims inserted after the first fetch never displace rows that
        // already existed on an earlier page.
        let late = insert_user(&pool, "latecomer").await;
        repo.try_claim(&late, slot.id).await.expect("late claim");
        let refetched = repo.list_slot_claimants(slot.id, 1, 5).await.expect("page 1 again");
        assert_eq!(refetched.items, first.items);
    }
}
