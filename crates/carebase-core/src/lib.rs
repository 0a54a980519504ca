//! CareBase Core Library
//!
//! Care management for home-nursing services: patients, caregivers, shift
//! rosters, home-visit tours, care documentation and insurance billing.
//!
//! # Architecture
//!
//! ```text
//!   Patients ──► Stops ──► Sequencer ──► Tour route ──► Cascade over the
//!                                            │          caregiver's later tours
//!                                            ▼
//!                                     Documentation
//!                                            │
//!                                  Documentation gate
//!                                            │
//!                                            ▼
//!                                   Insurance billing ──► JSON / CSV export
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence
//! - [`models`]: Domain types (Patient, Employee, Tour, Shift, ...)
//! - [`routing`]: Travel estimates, waypoint sequencing, cascading reschedule
//! - [`scheduling`]: Shift conflict detection
//! - [`gate`]: Documentation check before billing
//! - [`export`]: Billing export
//!
//! [`CareCore`] ties these together behind a thread-safe facade.

pub mod db;
pub mod export;
pub mod gate;
pub mod models;
pub mod routing;
pub mod scheduling;

mod service;

pub use db::Database;
pub use gate::{DocumentedKind, MissingDocumentation, Period};
pub use service::ChangeRequestOutcome;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveTime;

// =========================================================================
// Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum CareError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{} tour(s) or shift(s) lack documentation", .0.len())]
    MissingDocumentation(Vec<MissingDocumentation>),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type CareResult<T> = Result<T, CareError>;

impl From<db::DbError> for CareError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => CareError::NotFound(what),
            other => CareError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CareError {
    fn from(e: serde_json::Error) -> Self {
        CareError::Serialization(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CareError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CareError::Lock(e.to_string())
    }
}

// =========================================================================
// Settings
// =========================================================================

/// Business settings the core needs from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSettings {
    /// Tour start when a request gives none
    pub default_start_time: NaiveTime,
    /// Price of one minute of care, in cents
    pub cents_per_minute: i64,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            default_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            cents_per_minute: 50,
        }
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe facade over the store.
///
/// Every operation holds the database lock for its whole duration, so
/// multi-step mutations such as a tour edit with its cascade never
/// interleave.
#[derive(Clone)]
pub struct CareCore {
    db: Arc<Mutex<Database>>,
    settings: CoreSettings,
}

impl CareCore {
    /// Open or create a database at the given path. `":memory:"` opens a
    /// private in-memory database.
    pub fn open(path: &str, settings: CoreSettings) -> CareResult<Self> {
        let db = if path == ":memory:" {
            Database::open_in_memory()?
        } else {
            Database::open(path)?
        };
        Ok(Self::with_database(db, settings))
    }

    /// Create an in-memory core with default settings (for testing).
    pub fn open_in_memory() -> CareResult<Self> {
        Ok(Self::with_database(
            Database::open_in_memory()?,
            CoreSettings::default(),
        ))
    }

    pub fn with_database(db: Database, settings: CoreSettings) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            settings,
        }
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    fn lock(&self) -> CareResult<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }
}
