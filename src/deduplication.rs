// 🔍 De-duplication - biometric marker uniqueness
//
// Detection is a single exact-equality lookup on the stored marker. Every hit
// is appended to deduplication_conflicts in the same unit of work.
//
// The store's UNIQUE constraint is the authoritative rejection. The lookup in
// `enroll` only lets us report the duplicate before attempting the insert.

use crate::db::{format_timestamp, insert_citizen, now, parse_timestamp, Registry};
use crate::entities::{Citizen, DeduplicationConflict, NewCitizen};
use crate::error::{RegistryError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::warn;

/// Result of an enrollment attempt that reached the store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Enrollment {
    /// New citizen stored
    Enrolled(Citizen),

    /// Marker already belongs to another citizen; conflict logged, nothing stored
    Duplicate,
}

impl Registry {
    /// True iff some citizen already holds `biometric_hash`.
    ///
    /// A true result also appends one conflict row, even though nothing is
    /// being enrolled by this call.
    pub fn check_deduplication(&self, biometric_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let duplicate = marker_holder(&tx, biometric_hash)?.is_some();
            if duplicate {
                log_conflict(&tx, biometric_hash)?;
            }
            tx.commit()?;
            Ok(duplicate)
        })
    }

    /// De-duplication check and insert as one transaction.
    ///
    /// A marker collision, whether caught by the lookup or by the unique
    /// constraint at insert time, is logged and reported as
    /// [`Enrollment::Duplicate`]. A duplicate Aadhaar ID is a
    /// [`RegistryError::Conflict`].
    pub fn enroll(&self, new: &NewCitizen) -> Result<Enrollment> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            if marker_holder(&tx, &new.biometric_hash)?.is_some() {
                log_conflict(&tx, &new.biometric_hash)?;
                tx.commit()?;
                return Ok(Enrollment::Duplicate);
            }

            let outcome = match insert_citizen(&tx, new, now()) {
                Ok(citizen) => Enrollment::Enrolled(citizen),
                Err(RegistryError::Conflict(msg)) if msg.starts_with("Biometric") => {
                    log_conflict(&tx, &new.biometric_hash)?;
                    Enrollment::Duplicate
                }
                Err(e) => return Err(e),
            };

            tx.commit()?;
            Ok(outcome)
        })
    }

    /// Every recorded conflict, most recent first
    pub fn deduplication_conflicts(&self) -> Result<Vec<DeduplicationConflict>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT conflict_id, biometric_hash, attempt_date
                 FROM deduplication_conflicts
                 ORDER BY attempt_date DESC, conflict_id DESC",
            )?;

            let conflicts = stmt
                .query_map([], |row| {
                    let attempt_date: String = row.get(2)?;
                    Ok(DeduplicationConflict {
                        conflict_id: row.get(0)?,
                        biometric_hash: row.get(1)?,
                        attempt_date: parse_timestamp(2, &attempt_date)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(conflicts)
        })
    }
}

/// Aadhaar ID of the citizen holding `biometric_hash`, if any
fn marker_holder(conn: &Connection, biometric_hash: &str) -> Result<Option<String>> {
    let holder = conn
        .query_row(
            "SELECT aadhaar_id FROM citizens WHERE biometric_hash = ?1",
            [biometric_hash],
            |row| row.get(0),
        )
        .optional()?;
    Ok(holder)
}

fn log_conflict(conn: &Connection, biometric_hash: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO deduplication_conflicts (biometric_hash, attempt_date) VALUES (?1, ?2)",
        params![biometric_hash, format_timestamp(now())],
    )?;
    warn!("de-duplication conflict recorded");
    Ok(())
}
