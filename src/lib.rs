// Citizen Registry - Core Library
// Data access layer shared by the terminal dashboard, the API server, and tests

pub mod config;
pub mod error;
pub mod telemetry;
pub mod entities;
pub mod db;
pub mod deduplication;
pub mod authentication;
pub mod insights;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use config::{ConfigError, RegistryConfig};
pub use error::{RegistryError, Result};
pub use entities::{
    Citizen, CitizenProfile, NewCitizen, Demographics,
    AuthAttempt, AuthStatus, DeduplicationConflict,
    parse_dob, gender_index, AADHAAR_ID_MAX_LEN, GENDER_OPTIONS,
};
pub use db::{Registry, CitizenTable};
pub use deduplication::Enrollment;
pub use insights::{BusinessInsights, Advisory, AdvisoryLevel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
