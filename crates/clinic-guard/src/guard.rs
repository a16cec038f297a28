//! Decide whether a candidate appointment may be admitted.
//!
//! The candidate is compared against the existing bookings of each of its
//! three resources. Rooms are checked first, then the doctor, then the
//! patient, so the reported conflict is deterministic. Cancelled bookings and
//! the candidate's own prior booking (on a reschedule) are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::appointment::{Appointment, AppointmentId, Candidate, ResourceKind};
use crate::interval::overlap_minutes;

/// Existing appointments for each resource the candidate touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceAppointmentSets {
    pub room: Vec<Appointment>,
    pub doctor: Vec<Appointment>,
    pub patient: Vec<Appointment>,
}

impl ResourceAppointmentSets {
    /// The sets in checking order.
    fn in_order(&self) -> [(ResourceKind, &[Appointment]); 3] {
        [
            (ResourceKind::Room, self.room.as_slice()),
            (ResourceKind::Doctor, self.doctor.as_slice()),
            (ResourceKind::Patient, self.patient.as_slice()),
        ]
    }
}

/// A booking that the candidate collides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ResourceKind,
    pub appointment: AppointmentId,
    /// Shared span in whole minutes; 0 when the intervals only touch.
    pub overlap_minutes: i64,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conflicts with appointment {} ({} min overlap)",
            self.kind, self.appointment, self.overlap_minutes
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Rejected(Conflict),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted)
    }
}

/// Admit or reject `candidate` against the existing bookings in `context`.
///
/// Returns the first conflict found (room, then doctor, then patient).
pub fn can_schedule(candidate: &Candidate, context: &ResourceAppointmentSets) -> Decision {
    match conflicts(candidate, context).next() {
        Some(conflict) => Decision::Rejected(conflict),
        None => Decision::Accepted,
    }
}

/// Every conflict for `candidate`, in the order [`can_schedule`] checks them.
///
/// An appointment bound to several of the candidate's resources is reported
/// once per shared resource.
pub fn find_conflicts(candidate: &Candidate, context: &ResourceAppointmentSets) -> Vec<Conflict> {
    conflicts(candidate, context).collect()
}

fn conflicts<'a>(
    candidate: &'a Candidate,
    context: &'a ResourceAppointmentSets,
) -> impl Iterator<Item = Conflict> + 'a {
    context.in_order().into_iter().flat_map(move |(kind, existing)| {
        existing
            .iter()
            .filter(move |appointment| {
                appointment.is_active() && Some(appointment.id) != candidate.prior
            })
            .filter_map(move |appointment| {
                overlap_minutes(&candidate.interval, &appointment.interval).map(|minutes| {
                    Conflict {
                        kind,
                        appointment: appointment.id,
                        overlap_minutes: minutes,
                    }
                })
            })
    })
}
