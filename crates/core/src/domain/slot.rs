use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillState {
    Open,
    Full,
}

/// A bookable instant with a fixed head-count. `current_count` is derived
/// from live claims and must satisfy `0 <= current_count <= capacity` at
/// every commit point, not just at read time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub slot_at: NaiveDateTime,
    pub duration_minutes: u32,
    pub capacity: u32,
    pub current_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn fill_state(&self) -> FillState {
        if self.current_count >= self.capacity {
            FillState::Full
        } else {
            FillState::Open
        }
    }

    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.current_count)
    }
}

/// Registration and mutation inputs share the same positivity rules.
pub fn validate_capacity(capacity: u32) -> Result<(), CoreError> {
    if capacity == 0 {
        return Err(CoreError::InvalidInput("capacity must be at least 1".to_string()));
    }
    Ok(())
}

pub fn validate_duration(duration_minutes: u32) -> Result<(), CoreError> {
    if duration_minutes == 0 {
        return Err(CoreError::InvalidInput("duration must be at least 1 minute".to_string()));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created(Slot),
    DuplicateInstant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RescheduleOutcome {
    Applied,
    DuplicateInstant,
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapacityOutcome {
    Applied,
    BelowCurrentCount { current: u32 },
    SlotNotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { removed_claims: u32 },
    NotFound,
}
