//! # clinic-guard
//!
//! Keeps clinic appointments from double-booking a room, a doctor or a
//! patient.
//!
//! Every appointment binds one patient, one doctor and one room to a time
//! interval. Two active appointments that share any of those resources must
//! not overlap, where intervals are **closed**: a booking that ends at 16:30
//! and one that starts at 16:30 collide.
//!
//! ## Modules
//!
//! - [`interval`] - `TimeInterval` and the inclusive overlap rule
//! - [`appointment`] - appointments, candidates and resource keys
//! - [`guard`] - admit or reject a candidate against existing bookings
//! - [`store`] - storage collaborator trait and an in-memory store
//! - [`locks`] - per-resource leases around a scheduling decision
//! - [`scheduler`] - schedule, reschedule and cancel under those leases
//! - [`audit`] - find every double-booking in a set of appointments
//! - [`error`] - Error types

pub mod appointment;
pub mod audit;
pub mod error;
pub mod guard;
pub mod interval;
pub mod locks;
pub mod scheduler;
pub mod store;

pub use appointment::{
    Appointment, AppointmentId, AppointmentStatus, Candidate, DoctorId, PatientId, ResourceKey,
    ResourceKind, RoomName,
};
pub use audit::{find_violations, Violation};
pub use error::GuardError;
pub use guard::{can_schedule, find_conflicts, Conflict, Decision, ResourceAppointmentSets};
pub use interval::{overlap_minutes, overlaps, TimeInterval};
pub use scheduler::Scheduler;
pub use store::{AppointmentStore, InMemoryStore};
