// 👤 Citizen Entity - identity record keyed by Aadhaar ID
//
// The biometric marker is an opaque string standing in for a real template.
// It is unique across all citizens and never changes after enrollment.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of an Aadhaar ID (form constraint, matches the column width)
pub const AADHAAR_ID_MAX_LEN: usize = 12;

/// Date format used for date of birth, both on the wire and in the store
pub const DOB_FORMAT: &str = "%Y-%m-%d";

/// Gender choices offered by enrollment forms. The store accepts any string.
pub const GENDER_OPTIONS: [&str; 3] = ["Male", "Female", "Other"];

// ============================================================================
// CITIZEN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citizen {
    pub aadhaar_id: String,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: String,
    pub address: String,
    pub biometric_hash: String,
    pub enrollment_date: DateTime<Utc>,
}

impl Citizen {
    /// Demographic view with the biometric marker removed (eKYC data)
    pub fn profile(&self) -> CitizenProfile {
        CitizenProfile {
            aadhaar_id: self.aadhaar_id.clone(),
            name: self.name.clone(),
            dob: self.dob,
            gender: self.gender.clone(),
            address: self.address.clone(),
            enrollment_date: self.enrollment_date,
        }
    }

    /// Current demographic fields, used to pre-populate update forms
    pub fn demographics(&self) -> Option<Demographics> {
        self.dob.map(|dob| Demographics {
            name: self.name.clone(),
            dob,
            gender: self.gender.clone(),
            address: self.address.clone(),
        })
    }

    /// Age in completed years on `on`
    pub fn age_on(&self, on: NaiveDate) -> Option<u32> {
        self.dob.and_then(|dob| on.years_since(dob))
    }
}

/// Citizen without the biometric marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitizenProfile {
    pub aadhaar_id: String,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: String,
    pub address: String,
    pub enrollment_date: DateTime<Utc>,
}

// ============================================================================
// INPUTS
// ============================================================================

/// Enrollment input. Enrollment time is assigned by the store layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCitizen {
    pub aadhaar_id: String,
    pub name: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub address: String,
    pub biometric_hash: String,
}

/// The mutable part of a citizen record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub name: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub address: String,
}

impl NewCitizen {
    pub fn demographics(&self) -> Demographics {
        Demographics {
            name: self.name.clone(),
            dob: self.dob,
            gender: self.gender.clone(),
            address: self.address.clone(),
        }
    }
}

/// Parse a date of birth in `YYYY-MM-DD` form
pub fn parse_dob(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DOB_FORMAT).ok()
}

/// Position of `gender` in [`GENDER_OPTIONS`], falling back to "Other"
pub fn gender_index(gender: &str) -> usize {
    GENDER_OPTIONS
        .iter()
        .position(|g| g.eq_ignore_ascii_case(gender))
        .unwrap_or(GENDER_OPTIONS.len() - 1)
}
