//! Storage collaborator used by the scheduler.
//!
//! The guard only needs "all active appointments bound to a resource". The
//! remaining operations are the writes the scheduler commits once a decision
//! has been made.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::appointment::{Appointment, AppointmentId, AppointmentStatus, Candidate, ResourceKey};
use crate::error::{GuardError, Result};
use crate::interval::TimeInterval;

pub trait AppointmentStore: Send + Sync {
    /// All non-cancelled appointments bound to `resource`, in any order.
    fn list_active_appointments(&self, resource: &ResourceKey) -> Result<Vec<Appointment>>;

    fn find(&self, id: AppointmentId) -> Result<Option<Appointment>>;

    /// Persist an accepted candidate, assigning it a fresh id.
    fn insert(&self, candidate: &Candidate) -> Result<Appointment>;

    fn update_interval(&self, id: AppointmentId, interval: TimeInterval) -> Result<Appointment>;

    /// Mark an appointment cancelled, freeing its resources.
    fn cancel(&self, id: AppointmentId) -> Result<Appointment>;
}

#[derive(Debug, Default)]
struct Tables {
    appointments: BTreeMap<AppointmentId, Appointment>,
    /// Active appointment ids per resource.
    by_resource: HashMap<ResourceKey, BTreeSet<AppointmentId>>,
    next_id: u64,
}

impl Tables {
    fn index(&mut self, appointment: &Appointment) {
        for key in appointment.resources() {
            self.by_resource.entry(key).or_default().insert(appointment.id);
        }
    }

    fn unindex(&mut self, appointment: &Appointment) {
        for key in appointment.resources() {
            if let Some(ids) = self.by_resource.get_mut(&key) {
                ids.remove(&appointment.id);
                if ids.is_empty() {
                    self.by_resource.remove(&key);
                }
            }
        }
    }

    fn active_mut(&mut self, id: AppointmentId) -> Result<&mut Appointment> {
        let appointment = self
            .appointments
            .get_mut(&id)
            .ok_or(GuardError::UnknownAppointment(id))?;
        if !appointment.is_active() {
            return Err(GuardError::AlreadyCancelled(id));
        }
        Ok(appointment)
    }
}

/// Process-local store. Ids are assigned sequentially starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing appointments (e.g. a ledger loaded from
    /// disk). Later inserts get ids above the largest seeded one.
    ///
    /// Fails with [`GuardError::DuplicateAppointment`] if two appointments
    /// share an id.
    pub fn from_appointments(
        appointments: impl IntoIterator<Item = Appointment>,
    ) -> Result<Self> {
        let mut tables = Tables::default();
        for appointment in appointments {
            if tables.appointments.contains_key(&appointment.id) {
                return Err(GuardError::DuplicateAppointment(appointment.id));
            }
            tables.next_id = tables.next_id.max(appointment.id.0);
            if appointment.is_active() {
                tables.index(&appointment);
            }
            tables.appointments.insert(appointment.id, appointment);
        }
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// Every stored appointment, cancelled ones included, in id order.
    pub fn all(&self) -> Result<Vec<Appointment>> {
        Ok(self.read()?.appointments.values().cloned().collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| GuardError::Store("appointment table lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| GuardError::Store("appointment table lock poisoned".to_string()))
    }
}

impl AppointmentStore for InMemoryStore {
    fn list_active_appointments(&self, resource: &ResourceKey) -> Result<Vec<Appointment>> {
        let tables = self.read()?;
        let Some(ids) = tables.by_resource.get(resource) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| tables.appointments.get(id))
            .cloned()
            .collect())
    }

    fn find(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        Ok(self.read()?.appointments.get(&id).cloned())
    }

    fn insert(&self, candidate: &Candidate) -> Result<Appointment> {
        let mut tables = self.write()?;
        let id = tables
            .next_id
            .checked_add(1)
            .ok_or_else(|| GuardError::Store("appointment ids exhausted".to_string()))?;
        tables.next_id = id;
        let appointment = Appointment {
            id: AppointmentId(id),
            patient: candidate.patient,
            doctor: candidate.doctor,
            room: candidate.room.clone(),
            interval: candidate.interval,
            status: AppointmentStatus::Scheduled,
        };
        tables.index(&appointment);
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    fn update_interval(&self, id: AppointmentId, interval: TimeInterval) -> Result<Appointment> {
        let mut tables = self.write()?;
        let appointment = tables.active_mut(id)?;
        appointment.interval = interval;
        Ok(appointment.clone())
    }

    fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        let mut tables = self.write()?;
        let appointment = tables.active_mut(id)?;
        appointment.status = AppointmentStatus::Cancelled;
        let cancelled = appointment.clone();
        tables.unindex(&cancelled);
        Ok(cancelled)
    }
}
