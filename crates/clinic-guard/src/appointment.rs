//! Appointments and the resources they bind.
//!
//! Resources are referenced by opaque key only. An appointment never holds
//! the doctor, patient or room themselves, and the reverse direction
//! (resource → appointments) is an index kept by the store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interval::TimeInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub u64);

/// Rooms are keyed by their name (e.g. "Dentist").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(pub String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DoctorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of resource a booking can collide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Room,
    Doctor,
    Patient,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Room => "room",
            ResourceKind::Doctor => "doctor",
            ResourceKind::Patient => "patient",
        })
    }
}

/// A specific resource: its kind plus its identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ResourceKey {
    Room(RoomName),
    Doctor(DoctorId),
    Patient(PatientId),
}

impl ResourceKey {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceKey::Room(_) => ResourceKind::Room,
            ResourceKey::Doctor(_) => ResourceKind::Doctor,
            ResourceKey::Patient(_) => ResourceKind::Patient,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Room(name) => write!(f, "room {}", name),
            ResourceKey::Doctor(id) => write!(f, "doctor {}", id),
            ResourceKey::Patient(id) => write!(f, "patient {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Cancelled,
}

/// A booking of one patient with one doctor in one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient: PatientId,
    pub doctor: DoctorId,
    pub room: RoomName,
    #[serde(flatten)]
    pub interval: TimeInterval,
    #[serde(default)]
    pub status: AppointmentStatus,
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    /// The three resources this appointment occupies, room first.
    pub fn resources(&self) -> [ResourceKey; 3] {
        resource_keys(&self.room, self.doctor, self.patient)
    }
}

/// An appointment proposed for admission.
///
/// `prior` is set when the candidate moves an existing booking; that booking
/// is left out of the conflict check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub patient: PatientId,
    pub doctor: DoctorId,
    pub room: RoomName,
    pub interval: TimeInterval,
    pub prior: Option<AppointmentId>,
}

impl Candidate {
    pub fn new(
        patient: PatientId,
        doctor: DoctorId,
        room: RoomName,
        interval: TimeInterval,
    ) -> Self {
        Self {
            patient,
            doctor,
            room,
            interval,
            prior: None,
        }
    }

    /// The candidate produced by moving `existing` to `interval`.
    pub fn reschedule_of(existing: &Appointment, interval: TimeInterval) -> Self {
        Self {
            patient: existing.patient,
            doctor: existing.doctor,
            room: existing.room.clone(),
            interval,
            prior: Some(existing.id),
        }
    }

    pub fn resources(&self) -> [ResourceKey; 3] {
        resource_keys(&self.room, self.doctor, self.patient)
    }
}

fn resource_keys(room: &RoomName, doctor: DoctorId, patient: PatientId) -> [ResourceKey; 3] {
    [
        ResourceKey::Room(room.clone()),
        ResourceKey::Doctor(doctor),
        ResourceKey::Patient(patient),
    ]
}
