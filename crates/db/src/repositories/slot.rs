use chrono::{NaiveDateTime, Utc};
use sqlx::Row;

use shiftbot_core::domain::slot::{
    CapacityOutcome, DeleteOutcome, RegisterOutcome, RescheduleOutcome, Slot, SlotId,
};

use super::{
    decode_slot_at, decode_utc, encode_slot_at, is_unique_violation, RepositoryError,
    SlotRepository,
};
use crate::DbPool;

pub struct SqlSlotRepository {
    pool: DbPool,
}

impl SqlSlotRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SLOT_COLUMNS: &str = "id, slot_at, duration_minutes, capacity, current_count, created_at";

fn count_field(row: &sqlx::sqlite::SqliteRow, name: &str) -> Result<u32, RepositoryError> {
    let value: i64 = row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("column {name} out of range: {value}")))
}

pub(crate) fn row_to_slot(row: &sqlx::sqlite::SqliteRow) -> Result<Slot, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let slot_at_str: String =
        row.try_get("slot_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Slot {
        id: SlotId(id),
        slot_at: decode_slot_at(&slot_at_str)?,
        duration_minutes: count_field(row, "duration_minutes")?,
        capacity: count_field(row, "capacity")?,
        current_count: count_field(row, "current_count")?,
        created_at: decode_utc(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl SlotRepository for SqlSlotRepository {
    async fn find_by_id(&self, id: SlotId) -> Result<Option<Slot>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_slot(r)?)),
            None => Ok(None),
        }
    }

    async fn find_exact(&self, at: NaiveDateTime) -> Result<Option<Slot>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SLOT_COLUMNS} FROM slots WHERE slot_at = ?"))
            .bind(encode_slot_at(at))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_slot(r)?)),
            None => Ok(None),
        }
    }

    async fn find_in_window(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Slot>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots
             WHERE slot_at >= ? AND slot_at < ?
             ORDER BY slot_at ASC",
        ))
        .bind(encode_slot_at(start))
        .bind(encode_slot_at(end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_slot).collect::<Result<Vec<_>, _>>()
    }

    async fn register(
        &self,
        at: NaiveDateTime,
        duration_minutes: u32,
        capacity: u32,
    ) -> Result<RegisterOutcome, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO slots (slot_at, duration_minutes, capacity, current_count, created_at)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(encode_slot_at(at))
        .bind(duration_minutes)
        .bind(capacity)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(err) if is_unique_violation(&err) => return Ok(RegisterOutcome::DuplicateInstant),
            Err(err) => return Err(err.into()),
        };

        let id = SlotId(result.last_insert_rowid());
        let slot = self.find_by_id(id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("slot {} missing after insert", id.0))
        })?;

        Ok(RegisterOutcome::Created(slot))
    }

    async fn reschedule(
        &self,
        id: SlotId,
        new_at: NaiveDateTime,
    ) -> Result<RescheduleOutcome, RepositoryError> {
        let result = sqlx::query("UPDATE slots SET slot_at = ? WHERE id = ?")
            .bind(encode_slot_at(new_at))
            .bind(id.0)
            .execute(&self.pool)
            .await;

        match result {
            Ok(result) if result.rows_affected() == 0 => Ok(RescheduleOutcome::NotFound),
            Ok(_) => Ok(RescheduleOutcome::Applied),
            Err(err) if is_unique_violation(&err) => Ok(RescheduleOutcome::DuplicateInstant),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_capacity(
        &self,
        id: SlotId,
        capacity: u32,
    ) -> Result<CapacityOutcome, RepositoryError> {
        // Conditional update: shrinking below the live claim count must
        // not commit, even against a concurrent admission.
        let result = sqlx::query("UPDATE slots SET capacity = ? WHERE id = ? AND current_count <= ?")
            .bind(capacity)
            .bind(id.0)
            .bind(capacity)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            return Ok(CapacityOutcome::Applied);
        }

        let row = sqlx::query("SELECT current_count FROM slots WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(CapacityOutcome::BelowCurrentCount {
                current: count_field(r, "current_count")?,
            }),
            None => Ok(CapacityOutcome::SlotNotFound),
        }
    }

    async fn delete(&self, id: SlotId) -> Result<DeleteOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed_claims = sqlx::query("SELECT COUNT(*) AS count FROM claims WHERE slot_id = ?")
            .bind(id.0)
            .fetch_one(&mut *tx)
            .await?
            .get::<i64, _>("count");

        let result = sqlx::query("DELETE FROM slots WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(DeleteOutcome::NotFound);
        }

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted { removed_claims: removed_claims.max(0) as u32 })
    }

    async fn list_upcoming(&self, from: NaiveDateTime) -> Result<Vec<Slot>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots WHERE slot_at >= ? ORDER BY slot_at ASC",
        ))
        .bind(encode_slot_at(from))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_slot).collect::<Result<Vec<_>, _>>()
    }
}
