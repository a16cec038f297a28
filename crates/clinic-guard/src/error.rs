//! Error types for clinic-guard operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::appointment::AppointmentId;
use crate::guard::Conflict;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    /// `starts_at` is not strictly before `finishes_at`.
    #[error("Invalid interval: {starts_at} is not before {finishes_at}")]
    InvalidInterval {
        starts_at: DateTime<Utc>,
        finishes_at: DateTime<Utc>,
    },

    #[error("Resource conflict: {0}")]
    ResourceConflict(Conflict),

    #[error("Unknown appointment: {0}")]
    UnknownAppointment(AppointmentId),

    #[error("Appointment already cancelled: {0}")]
    AlreadyCancelled(AppointmentId),

    /// Two seeded appointments share an id.
    #[error("Duplicate appointment id: {0}")]
    DuplicateAppointment(AppointmentId),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
