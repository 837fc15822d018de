// De-duplication conflict - append-only log entry
// Written whenever an enrollment's biometric marker matches an existing citizen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeduplicationConflict {
    pub conflict_id: i64,
    pub biometric_hash: String,
    pub attempt_date: DateTime<Utc>,
}
