// Authentication - simulated biometric verification
// Plain byte-for-byte comparison of the supplied marker against the stored one.

use crate::db::{format_timestamp, now, parse_timestamp, Registry};
use crate::entities::{AuthAttempt, AuthStatus};
use crate::error::Result;
use rusqlite::{params, OptionalExtension};
use tracing::info;

impl Registry {
    /// Verify `biometric_hash` against the citizen `aadhaar_id`.
    ///
    /// Every call appends exactly one auth_log row with the outcome. An
    /// identifier with no citizen behind it is logged with a NULL reference.
    pub fn authenticate(&self, aadhaar_id: &str, biometric_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let stored: Option<String> = tx
                .query_row(
                    "SELECT biometric_hash FROM citizens WHERE aadhaar_id = ?1",
                    [aadhaar_id],
                    |row| row.get(0),
                )
                .optional()?;

            let status = match &stored {
                Some(marker) if marker.as_bytes() == biometric_hash.as_bytes() => AuthStatus::Success,
                _ => AuthStatus::Failed,
            };

            tx.execute(
                "INSERT INTO auth_log (aadhaar_id, attempt_date, status) VALUES (?1, ?2, ?3)",
                params![
                    stored.as_ref().map(|_| aadhaar_id),
                    format_timestamp(now()),
                    status.as_str(),
                ],
            )?;
            tx.commit()?;

            info!(
                aadhaar_id,
                known = stored.is_some(),
                status = status.as_str(),
                "authentication attempt"
            );
            Ok(status.is_success())
        })
    }

    /// Every authentication attempt, most recent first
    pub fn auth_log(&self) -> Result<Vec<AuthAttempt>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT log_id, aadhaar_id, attempt_date, status
                 FROM auth_log
                 ORDER BY attempt_date DESC, log_id DESC",
            )?;

            let attempts = stmt
                .query_map([], |row| {
                    let attempt_date: String = row.get(2)?;
                    let status: String = row.get(3)?;
                    Ok(AuthAttempt {
                        log_id: row.get(0)?,
                        aadhaar_id: row.get(1)?,
                        attempt_date: parse_timestamp(2, &attempt_date)?,
                        status: AuthStatus::from_db(&status),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(attempts)
        })
    }
}
