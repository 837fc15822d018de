// 🔑 Authentication Attempt - append-only log entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Success,
    Failed,
}

impl AuthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Success => "success",
            AuthStatus::Failed => "failed",
        }
    }

    /// Anything other than "success" reads back as a failure
    pub fn from_db(s: &str) -> Self {
        if s == "success" {
            AuthStatus::Success
        } else {
            AuthStatus::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        *self == AuthStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthAttempt {
    pub log_id: i64,

    /// None when the attempt named an identifier with no citizen behind it
    pub aadhaar_id: Option<String>,

    pub attempt_date: DateTime<Utc>,
    pub status: AuthStatus,
}
