//! Create, move and cancel appointments without double-booking.
//!
//! Each operation leases the room, doctor and patient keys it touches, reads
//! the active bookings of those resources, runs the guard, and commits only
//! on acceptance, all before the lease is released. Concurrent requests on
//! any shared resource are therefore serialized; requests on disjoint
//! resources are not.

use tracing::{debug, info, instrument, warn};

use crate::appointment::{Appointment, AppointmentId, Candidate, DoctorId, PatientId, RoomName};
use crate::error::{GuardError, Result};
use crate::guard::{can_schedule, find_conflicts, Conflict, Decision, ResourceAppointmentSets};
use crate::interval::TimeInterval;
use crate::locks::ResourceLocks;
use crate::store::AppointmentStore;

pub struct Scheduler<S> {
    store: S,
    locks: ResourceLocks,
}

impl<S: AppointmentStore> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: ResourceLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Book a new appointment.
    ///
    /// # Errors
    /// `GuardError::ResourceConflict` when any of the three resources is
    /// already booked for an overlapping interval.
    #[instrument(skip_all, fields(room = %room, doctor = %doctor, patient = %patient, %interval))]
    pub fn schedule(
        &self,
        patient: PatientId,
        doctor: DoctorId,
        room: RoomName,
        interval: TimeInterval,
    ) -> Result<Appointment> {
        let candidate = Candidate::new(patient, doctor, room, interval);
        let _lease = self.locks.acquire(candidate.resources())?;

        admit(&self.store, &candidate)?;
        let appointment = self.store.insert(&candidate)?;
        info!(appointment = %appointment.id, %interval, "appointment scheduled");
        Ok(appointment)
    }

    /// Move an active appointment to `interval`. Its current booking does not
    /// count against itself.
    #[instrument(skip(self))]
    pub fn reschedule(&self, id: AppointmentId, interval: TimeInterval) -> Result<Appointment> {
        let existing = self.active(id)?;
        let _lease = self.locks.acquire(existing.resources())?;
        // Re-read under the lease: a concurrent cancel may have won.
        let existing = self.active(id)?;

        let candidate = Candidate::reschedule_of(&existing, interval);
        admit(&self.store, &candidate)?;
        let moved = self.store.update_interval(id, interval)?;
        info!(appointment = %id, from = %existing.interval, to = %interval, "appointment rescheduled");
        Ok(moved)
    }

    /// Cancel an active appointment, freeing its room, doctor and patient.
    #[instrument(skip(self))]
    pub fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        let existing = self.active(id)?;
        let _lease = self.locks.acquire(existing.resources())?;

        let cancelled = self.store.cancel(id)?;
        info!(appointment = %id, "appointment cancelled");
        Ok(cancelled)
    }

    /// Evaluate `candidate` against current bookings without committing.
    #[instrument(skip(self, candidate), fields(room = %candidate.room, prior = ?candidate.prior))]
    pub fn check(&self, candidate: &Candidate) -> Result<Decision> {
        let _lease = self.locks.acquire(candidate.resources())?;
        let context = gather(&self.store, candidate)?;
        Ok(can_schedule(candidate, &context))
    }

    /// Like [`check`](Self::check), but every conflict, in checking order.
    #[instrument(skip(self, candidate), fields(room = %candidate.room, prior = ?candidate.prior))]
    pub fn check_all(&self, candidate: &Candidate) -> Result<Vec<Conflict>> {
        let _lease = self.locks.acquire(candidate.resources())?;
        let context = gather(&self.store, candidate)?;
        Ok(find_conflicts(candidate, &context))
    }

    fn active(&self, id: AppointmentId) -> Result<Appointment> {
        let appointment = self
            .store
            .find(id)?
            .ok_or(GuardError::UnknownAppointment(id))?;
        if !appointment.is_active() {
            return Err(GuardError::AlreadyCancelled(id));
        }
        Ok(appointment)
    }
}

/// Existing bookings for each of the candidate's resources.
pub fn gather<S: AppointmentStore + ?Sized>(
    store: &S,
    candidate: &Candidate,
) -> Result<ResourceAppointmentSets> {
    let [room, doctor, patient] = candidate.resources();
    Ok(ResourceAppointmentSets {
        room: store.list_active_appointments(&room)?,
        doctor: store.list_active_appointments(&doctor)?,
        patient: store.list_active_appointments(&patient)?,
    })
}

fn admit<S: AppointmentStore + ?Sized>(store: &S, candidate: &Candidate) -> Result<()> {
    let context = gather(store, candidate)?;
    debug!(
        room = context.room.len(),
        doctor = context.doctor.len(),
        patient = context.patient.len(),
        "checking candidate against existing bookings"
    );
    match can_schedule(candidate, &context) {
        Decision::Accepted => Ok(()),
        Decision::Rejected(conflict) => {
            warn!(
                kind = %conflict.kind,
                conflicting = %conflict.appointment,
                overlap_minutes = conflict.overlap_minutes,
                "candidate rejected"
            );
            Err(GuardError::ResourceConflict(conflict))
        }
    }
}
