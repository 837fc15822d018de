// Entity Models
// The three persisted record kinds. The store owns all state; these are
// plain values read from or written to it.

pub mod citizen;
pub mod auth_attempt;
pub mod conflict;

pub use citizen::{
    Citizen, CitizenProfile, NewCitizen, Demographics,
    parse_dob, gender_index, AADHAAR_ID_MAX_LEN, DOB_FORMAT, GENDER_OPTIONS,
};
pub use auth_attempt::{AuthAttempt, AuthStatus};
pub use conflict::DeduplicationConflict;
