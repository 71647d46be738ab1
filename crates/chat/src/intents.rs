use shiftbot_core::domain::user::UserToken;

/// One inbound message, already resolved to a structured intent by the
/// messenger adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentEnvelope {
    pub user: UserToken,
    pub intent: Intent,
}

/// A line of the batch registration form: day/hour/minute plus shift
/// length and head-count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSpec {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub duration_minutes: u32,
    pub capacity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// First contact; registers the user under a chosen nickname.
    Welcome { nickname: String },
    /// Claim a seat on the slot matching the given hour.
    Apply { day: u32, hour: u32, duration_hours: Option<u32> },
    ListMyClaims { page: u32 },
    CancelClaim { claim_id: i64 },
    /// Public roster of upcoming slots with fill markers.
    Status,

    // Admin intents.
    RegisterSlots { lines: Vec<SlotSpec> },
    /// Step one of the two-step reschedule flow.
    ModifySelect { day: u32, hour: u32 },
    /// Step two; only meaningful while a selection is pending.
    NewTime { day: u32, hour: u32, minute: u32 },
    SetCapacity { day: u32, hour: u32, capacity: u32 },
    DeleteSlot { day: u32, hour: u32 },
    ListClaimants { day: u32, hour: u32, page: u32 },
    AddAdmin { target: String, nickname: String },
    RemoveAdmin { target: String },
}

impl Intent {
    /// Intents gated behind the admin allow-list.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::RegisterSlots { .. }
                | Self::ModifySelect { .. }
                | Self::NewTime { .. }
                | Self::SetCapacity { .. }
                | Self::DeleteSlot { .. }
                | Self::ListClaimants { .. }
                | Self::AddAdmin { .. }
                | Self::RemoveAdmin { .. }
        )
    }
}
