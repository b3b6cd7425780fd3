use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

/// Server membership tier. Owner and Admin may modify any message on the
/// server; Guest may only modify their own.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Guest,
}

impl Role {
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "guest" => Ok(Role::Guest),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }
}

/// One row per (profile, server) pair.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Member {
    pub id: String,
    pub profile_id: String,
    pub server_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
