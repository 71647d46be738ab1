use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque messenger identity. Unique per user; nicknames are not.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserToken(pub String);

impl UserToken {
    /// Nickname assigned when a user claims a slot without ever passing
    /// through the welcome flow.
    pub fn placeholder_nickname(&self) -> String {
        let prefix: String = self.0.chars().take(6).collect();
        format!("유저{prefix}")
    }
}

impl std::fmt::Display for UserToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub token: UserToken,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}
