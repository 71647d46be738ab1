use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::slot::{Slot, SlotId};
use crate::domain::user::UserToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub i64);

/// A successful binding of one user to one slot. At most one claim may
/// exist per (user, slot) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub user_token: UserToken,
    pub slot_id: SlotId,
    pub applied_at: DateTime<Utc>,
}

/// Roster row for a user's own claim listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimWithSlot {
    pub claim_id: ClaimId,
    pub applied_at: DateTime<Utc>,
    pub slot: Slot,
}

/// Roster row for a slot's claimant listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claimant {
    pub claim_id: ClaimId,
    pub user_token: UserToken,
    pub nickname: String,
    pub applied_at: DateTime<Utc>,
}

/// Result of one admission attempt. Under concurrent attempts against the
/// same slot, at most `capacity` calls ever observe `Accepted`; every
/// loser observes `Full` or `AlreadyClaimed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Accepted { current_count: u32, capacity: u32 },
    AlreadyClaimed,
    Full,
    SlotNotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    Removed,
    NotFound,
}
