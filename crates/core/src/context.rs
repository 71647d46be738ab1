//! Per-user conversation context for the two-step slot edit flow.
//!
//! Step 1 (select) stores which slot the admin wants to move; step 2
//! (new time) consumes it. One entry per user key, last-select-wins,
//! read-once on consumption. The arena is process-local: a restart loses
//! pending edits and the admin simply restarts the flow.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use dashmap::DashMap;

use crate::domain::slot::SlotId;
use crate::domain::user::UserToken;

pub const DEFAULT_TTL_MINUTES: i64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    pub slot_id: SlotId,
    pub original_at: NaiveDateTime,
    pub started_at: DateTime<Utc>,
}

pub struct ContextStore {
    entries: DashMap<UserToken, PendingEdit>,
    ttl: Duration,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_MINUTES)
    }
}

impl ContextStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self { entries: DashMap::new(), ttl: Duration::minutes(ttl_minutes.max(1)) }
    }

    /// Enter `AwaitingNewTime` for this user, replacing any pending edit.
    pub fn begin(&self, user: UserToken, slot_id: SlotId, original_at: NaiveDateTime) {
        self.entries.insert(user, PendingEdit { slot_id, original_at, started_at: Utc::now() });
    }

    /// Consume the pending edit. Removal is atomic on the map shard, so a
    /// double-tap of step 2 yields the entry to exactly one request.
    pub fn take(&self, user: &UserToken) -> Option<PendingEdit> {
        let (_, edit) = self.entries.remove(user)?;
        if Utc::now() - edit.started_at > self.ttl {
            return None;
        }
        Some(edit)
    }

    pub fn is_awaiting(&self, user: &UserToken) -> bool {
        self.entries
            .get(user)
            .map(|entry| Utc::now() - entry.started_at <= self.ttl)
            .unwrap_or(false)
    }
}
