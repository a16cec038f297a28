//! Verify a whole set of appointments against the no-double-booking rule.
//!
//! Active appointments are grouped by resource and compared pairwise within
//! each group. Any overlapping pair (touching included) is a violation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::appointment::{Appointment, AppointmentId, ResourceKey};
use crate::interval::overlap_minutes;

/// Two active appointments that overlap on the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub resource: ResourceKey,
    /// The lower of the two ids.
    pub first: AppointmentId,
    pub second: AppointmentId,
    pub overlap_minutes: i64,
}

/// Find every overlapping pair of active appointments sharing a resource.
///
/// A pair sharing two resources (say, the same doctor and the same room) is
/// reported once for each. Output is ordered by resource, then by ids. An
/// empty result means no resource is double-booked.
///
/// Ids are expected to be unique; load untrusted ledgers through
/// [`InMemoryStore::from_appointments`](crate::InMemoryStore::from_appointments)
/// first.
pub fn find_violations(appointments: &[Appointment]) -> Vec<Violation> {
    let mut by_resource: BTreeMap<ResourceKey, Vec<&Appointment>> = BTreeMap::new();
    for appointment in appointments.iter().filter(|a| a.is_active()) {
        for key in appointment.resources() {
            by_resource.entry(key).or_default().push(appointment);
        }
    }

    let mut violations = Vec::new();
    for (resource, mut group) in by_resource {
        group.sort_by_key(|a| a.id);
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                if let Some(minutes) = overlap_minutes(&a.interval, &b.interval) {
                    violations.push(Violation {
                        resource: resource.clone(),
                        first: a.id,
                        second: b.id,
                        overlap_minutes: minutes,
                    });
                }
            }
        }
    }

    violations
}
