use crate::config::RegistryConfig;
use crate::entities::{Citizen, Demographics, NewCitizen, AADHAAR_ID_MAX_LEN, DOB_FORMAT};
use crate::error::{RegistryError, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Columns of the citizens table, in table order
pub const CITIZEN_COLUMNS: &str =
    "aadhaar_id, name, dob, gender, address, biometric_hash, enrollment_date";

/// Handle to the citizen store.
///
/// Cloning is cheap; all clones share one connection. Each operation holds the
/// connection for exactly one unit of work and releases it on every exit path.
#[derive(Clone)]
pub struct Registry {
    conn: Arc<Mutex<Connection>>,
}

/// Every citizen plus the column names, for tabular display
#[derive(Debug, Clone, Serialize)]
pub struct CitizenTable {
    pub columns: Vec<String>,
    pub rows: Vec<Citizen>,
}

impl Registry {
    pub fn open(config: &RegistryConfig) -> Result<Self> {
        if config.is_in_memory() {
            Self::open_in_memory()
        } else {
            Self::open_path(&config.db_path)
        }
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| RegistryError::ConnectionFailure(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "database opened");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RegistryError::ConnectionFailure(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Per-connection setting; auth_log rows must reference real citizens
        conn.pragma_update(None, "foreign_keys", true)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run one unit of work against the connection
    pub(crate) fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| RegistryError::ConnectionFailure("connection lock poisoned".to_string()))?;
        f(&mut guard)
    }

    // ========================================================================
    // SCHEMA
    // ========================================================================

    /// Create all tables if missing. Safe to call on every startup.
    pub fn initialize_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            // WAL for crash recovery (in-memory stores report "memory")
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS citizens (
                    aadhaar_id VARCHAR(12) PRIMARY KEY
                        CHECK (length(aadhaar_id) BETWEEN 1 AND 12),
                    name TEXT NOT NULL,
                    dob TEXT,
                    gender VARCHAR(10),
                    address TEXT,
                    biometric_hash TEXT UNIQUE NOT NULL,
                    enrollment_date TEXT
                );

                CREATE TABLE IF NOT EXISTS auth_log (
                    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    aadhaar_id VARCHAR(12) REFERENCES citizens(aadhaar_id),
                    attempt_date TEXT NOT NULL,
                    status VARCHAR(10) NOT NULL CHECK (status IN ('success', 'failed'))
                );

                CREATE TABLE IF NOT EXISTS deduplication_conflicts (
                    conflict_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    biometric_hash TEXT NOT NULL,
                    attempt_date TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_auth_log_citizen ON auth_log(aadhaar_id);
                CREATE INDEX IF NOT EXISTS idx_auth_log_date ON auth_log(attempt_date);
                CREATE INDEX IF NOT EXISTS idx_conflicts_date ON deduplication_conflicts(attempt_date);",
            )?;

            info!(journal_mode = %mode, "schema ready");
            Ok(())
        })
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Insert a citizen stamped with the current time.
    ///
    /// Does not run the de-duplication check; a duplicate identifier or marker
    /// surfaces as [`RegistryError::Conflict`] from the store's constraints.
    pub fn create_citizen(&self, new: &NewCitizen) -> Result<Citizen> {
        self.with_conn(|conn| insert_citizen(conn, new, now()))
    }

    pub fn read_citizen(&self, aadhaar_id: &str) -> Result<Option<Citizen>> {
        self.with_conn(|conn| {
            let citizen = conn
                .query_row(
                    &format!("SELECT {CITIZEN_COLUMNS} FROM citizens WHERE aadhaar_id = ?1"),
                    [aadhaar_id],
                    citizen_from_row,
                )
                .optional()?;
            Ok(citizen)
        })
    }

    pub fn read_all_citizens(&self) -> Result<CitizenTable> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CITIZEN_COLUMNS} FROM citizens ORDER BY enrollment_date, aadhaar_id"
            ))?;

            let columns = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();

            let rows = stmt
                .query_map([], citizen_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(CitizenTable { columns, rows })
        })
    }

    /// Overwrite the demographic fields. The marker is never touched.
    ///
    /// Returns [`RegistryError::NotFound`] when no citizen has `aadhaar_id`.
    pub fn update_citizen(&self, aadhaar_id: &str, demographics: &Demographics) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE citizens
                 SET name = ?1, dob = ?2, gender = ?3, address = ?4
                 WHERE aadhaar_id = ?5",
                params![
                    demographics.name,
                    format_dob(demographics.dob),
                    demographics.gender,
                    demographics.address,
                    aadhaar_id,
                ],
            )?;

            if updated == 0 {
                debug!(aadhaar_id, "update matched no citizen");
                return Err(RegistryError::NotFound(format!(
                    "no citizen with Aadhaar ID {aadhaar_id}"
                )));
            }

            info!(aadhaar_id, "citizen updated");
            Ok(())
        })
    }

    /// Remove a citizen and its authentication history in one transaction.
    ///
    /// Returns whether a citizen row existed.
    pub fn delete_citizen(&self, aadhaar_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let auth_rows = tx.execute("DELETE FROM auth_log WHERE aadhaar_id = ?1", [aadhaar_id])?;
            let removed = tx.execute("DELETE FROM citizens WHERE aadhaar_id = ?1", [aadhaar_id])?;
            tx.commit()?;

            if removed > 0 {
                info!(aadhaar_id, auth_rows, "citizen deleted");
            } else {
                warn!(aadhaar_id, "delete matched no citizen");
            }
            Ok(removed > 0)
        })
    }
}

// ============================================================================
// ROW HELPERS
// ============================================================================

pub(crate) fn insert_citizen(
    conn: &Connection,
    new: &NewCitizen,
    enrolled_at: DateTime<Utc>,
) -> Result<Citizen> {
    // SQLite does not enforce VARCHAR widths
    let id_len = new.aadhaar_id.chars().count();
    if id_len == 0 || id_len > AADHAAR_ID_MAX_LEN {
        return Err(RegistryError::Conflict(aadhaar_id_length_message()));
    }

    conn.execute(
        &format!("INSERT INTO citizens ({CITIZEN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            new.aadhaar_id,
            new.name,
            format_dob(new.dob),
            new.gender,
            new.address,
            new.biometric_hash,
            format_timestamp(enrolled_at),
        ],
    )
    .map_err(|e| describe_citizen_conflict(e.into(), &new.aadhaar_id))?;

    info!(aadhaar_id = %new.aadhaar_id, "citizen enrolled");

    Ok(Citizen {
        aadhaar_id: new.aadhaar_id.clone(),
        name: new.name.clone(),
        dob: Some(new.dob),
        gender: new.gender.clone(),
        address: new.address.clone(),
        biometric_hash: new.biometric_hash.clone(),
        enrollment_date: enrolled_at,
    })
}

/// Turn a raw constraint message into one naming the duplicated field
pub(crate) fn describe_citizen_conflict(err: RegistryError, aadhaar_id: &str) -> RegistryError {
    match err {
        RegistryError::Conflict(msg) if msg.contains("CHECK constraint") => {
            RegistryError::Conflict(aadhaar_id_length_message())
        }
        RegistryError::Conflict(msg) if msg.contains("biometric_hash") => {
            RegistryError::Conflict("Biometric ID already exists".to_string())
        }
        RegistryError::Conflict(msg) if msg.contains("aadhaar_id") => {
            RegistryError::Conflict(format!("Aadhaar ID {aadhaar_id} already exists"))
        }
        other => other,
    }
}

fn aadhaar_id_length_message() -> String {
    format!("Aadhaar ID must be 1 to {AADHAAR_ID_MAX_LEN} characters")
}

fn citizen_from_row(row: &Row<'_>) -> rusqlite::Result<Citizen> {
    let dob: Option<String> = row.get(2)?;
    let dob = match dob {
        Some(s) => Some(
            NaiveDate::parse_from_str(&s, DOB_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        ),
        None => None,
    };

    let enrollment_date: String = row.get(6)?;

    Ok(Citizen {
        aadhaar_id: row.get(0)?,
        name: row.get(1)?,
        dob,
        gender: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        address: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        biometric_hash: row.get(5)?,
        enrollment_date: parse_timestamp(6, &enrollment_date)?,
    })
}

/// Current time at the precision the store keeps
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so that text order equals time order
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_dob(dob: NaiveDate) -> String {
    dob.format(DOB_FORMAT).to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_registry() -> Registry {
        let registry = Registry::open_in_memory().unwrap();
        registry.initialize_schema().unwrap();
        registry
    }

    /// Helper to build enrollment input with all required fields
    pub(crate) fn new_citizen(aadhaar_id: &str, marker: &str, dob: &str) -> NewCitizen {
        NewCitizen {
            aadhaar_id: aadhaar_id.to_string(),
            name: format!("Citizen {aadhaar_id}"),
            dob: NaiveDate::parse_from_str(dob, DOB_FORMAT).unwrap(),
            gender: "Other".to_string(),
            address: "1 Test Lane, Bengaluru".to_string(),
            biometric_hash: marker.to_string(),
        }
    }

    pub(crate) fn count(registry: &Registry, sql: &str) -> i64 {
        registry
            .with_conn(|conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_schema_is_idempotent() {
        let registry = test_registry();
        registry.initialize_schema().unwrap();
        registry.initialize_schema().unwrap();

        assert_eq!(count(&registry, "SELECT COUNT(*) FROM citizens"), 0);
        assert_eq!(count(&registry, "SELECT COUNT(*) FROM auth_log"), 0);
        assert_eq!(count(&registry, "SELECT COUNT(*) FROM deduplication_conflicts"), 0);
    }

    #[test]
    fn test_create_then_read_round_trip() {
        let registry = test_registry();
        let new = new_citizen("A1", "h1", "1990-01-01");

        let created = registry.create_citizen(&new).unwrap();
        let read = registry.read_citizen("A1").unwrap().expect("citizen should exist");

        assert_eq!(read, created);
        assert_eq!(read.name, new.name);
        assert_eq!(read.dob, Some(new.dob));
        assert_eq!(read.gender, new.gender);
        assert_eq!(read.address, new.address);
        assert_eq!(read.biometric_hash, "h1");
    }

    #[test]
    fn test_read_missing_citizen_is_none() {
        let registry = test_registry();
        assert!(registry.read_citizen("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_marker_is_conflict() {
        let registry = test_registry();
        registry.create_citizen(&new_citizen("A1", "h1", "1990-01-01")).unwrap();

        let err = registry
            .create_citizen(&new_citizen("A2", "h1", "1985-05-05"))
            .unwrap_err();

        assert!(matches!(err, RegistryError::Conflict(ref m) if m.contains("Biometric")));
        assert_eq!(count(&registry, "SELECT COUNT(*) FROM citizens WHERE biometric_hash = 'h1'"), 1);
    }

    #[test]
    fn test_duplicate_id_is_conflict() {
        let registry = test_registry();
        registry.create_citizen(&new_citizen("A1", "h1", "1990-01-01")).unwrap();

        let err = registry
            .create_citizen(&new_citizen("A1", "h2", "1990-01-01"))
            .unwrap_err();

        assert!(matches!(err, RegistryError::Conflict(ref m) if m.contains("A1")));
    }

    #[test]
    fn test_read_all_citizens_returns_columns_and_rows() {
        let registry = test_registry();
        registry.create_citizen(&new_citizen("A1", "h1", "1990-01-01")).unwrap();
        registry.create_citizen(&new_citizen("A2", "h2", "1980-01-01")).unwrap();

        let table = registry.read_all_citizens().unwrap();

        assert_eq!(
            table.columns,
            vec![
                "aadhaar_id",
                "name",
                "dob",
                "gender",
                "address",
                "biometric_hash",
                "enrollment_date"
            ]
        );
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_update_overwrites_demographics_only() {
        let registry = test_registry();
        registry.create_citizen(&new_citizen("A1", "h1", "1990-01-01")).unwrap();

        let demographics = Demographics {
            name: "Renamed".to_string(),
            dob: NaiveDate::from_ymd_opt(1991, 2, 3).unwrap(),
            gender: "Male".to_string(),
            address: "New address".to_string(),
        };
        registry.update_citizen("A1", &demographics).unwrap();

        let read = registry.read_citizen("A1").unwrap().unwrap();
        assert_eq!(read.demographics(), Some(demographics));
        assert_eq!(read.biometric_hash, "h1");
    }

    #[test]
    fn test_update_missing_citizen_is_not_found() {
        let registry = test_registry();
        let demographics = new_citizen("A9", "h9", "1990-01-01").demographics();

        let err = registry.update_citizen("A9", &demographics).unwrap_err();

        assert!(matches!(err, RegistryError::NotFound(_)));
        assert!(registry.read_citizen("A9").unwrap().is_none());
    }

    #[test]
    fn test_delete_removes_citizen_and_auth_history() {
        let registry = test_registry();
        registry.create_citizen(&new_citizen("A1", "h1", "1990-01-01")).unwrap();
        registry.create_citizen(&new_citizen("A2", "h2", "1990-01-01")).unwrap();
        registry.authenticate("A1", "h1").unwrap();
        registry.authenticate("A1", "nope").unwrap();
        registry.authenticate("A2", "h2").unwrap();

        assert!(registry.delete_citizen("A1").unwrap());

        assert!(registry.read_citizen("A1").unwrap().is_none());
        assert_eq!(count(&registry, "SELECT COUNT(*) FROM auth_log WHERE aadhaar_id = 'A1'"), 0);
        assert_eq!(count(&registry, "SELECT COUNT(*) FROM auth_log"), 1);
    }

    #[test]
    fn test_delete_missing_citizen_reports_nothing_removed() {
        let registry = test_registry();
        assert!(!registry.delete_citizen("ghost").unwrap());
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let earlier = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z").unwrap().with_timezone(&Utc);
        let later = DateTime::parse_from_rfc3339("2024-01-02T03:04:05.5Z").unwrap().with_timezone(&Utc);

        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(parse_timestamp(0, &format_timestamp(later)).unwrap(), later);
    }

    #[test]
    fn test_aadhaar_id_length_is_enforced() {
        let registry = test_registry();

        for id in ["1234567890123456789", ""] {
            let err = registry
                .create_citizen(&new_citizen(id, "h1", "1990-01-01"))
                .unwrap_err();
            assert!(matches!(err, RegistryError::Conflict(ref m) if m.contains("1 to 12")));
        }
        registry.create_citizen(&new_citizen("123456789012", "h1", "1990-01-01")).unwrap();

        assert_eq!(count(&registry, "SELECT COUNT(*) FROM citizens"), 1);
    }

    #[test]
    fn test_schema_rejects_overlong_aadhaar_id() {
        let registry = test_registry();

        let err = registry
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO citizens (aadhaar_id, name, biometric_hash) VALUES (?1, 'x', 'h1')",
                    ["1234567890123"],
                )?;
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, RegistryError::Conflict(_)));
    }

    #[test]
    fn test_poisoned_lock_is_connection_failure() {
        let registry = test_registry();
        let holder = registry.clone();

        let joined = std::thread::spawn(move || {
            let _ = holder.with_conn(|_| -> Result<()> { panic!("worker died holding the connection") });
        })
        .join();
        assert!(joined.is_err());

        let err = registry.read_citizen("A1").unwrap_err();
        assert!(matches!(err, RegistryError::ConnectionFailure(_)));
        assert_eq!(err.kind(), "connection_failure");
    }

    #[test]
    fn test_open_unreachable_path_is_connection_failure() {
        let err = Registry::open_path(Path::new("/nonexistent-dir/for/registry/citizens.db"))
            .err()
            .expect("open should fail");
        assert!(matches!(err, RegistryError::ConnectionFailure(_)));
    }
}
