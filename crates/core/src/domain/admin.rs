use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserToken;

/// `added_by` value marking the bootstrap super-admin. That record is
/// inserted directly into the store and must never be removable through
/// the grant/revoke flow.
pub const SYSTEM_GRANTOR: &str = "system";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub user_token: UserToken,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

impl Admin {
    pub fn is_super_admin(&self) -> bool {
        self.added_by == SYSTEM_GRANTOR
    }
}
