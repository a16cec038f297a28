//! Tests for scheduling, rescheduling and cancellation through the
//! in-memory store, including concurrent booking attempts.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use clinic_guard::error::Result;
use clinic_guard::locks::ResourceLocks;
use clinic_guard::{
    find_violations, Appointment, AppointmentId, AppointmentStatus, AppointmentStore, Candidate,
    Decision, DoctorId, GuardError, InMemoryStore, PatientId, ResourceKey, ResourceKind, RoomName,
    Scheduler, TimeInterval,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn interval(start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> TimeInterval {
    TimeInterval::new(
        Utc.with_ymd_and_hms(2023, 6, 27, start_hour, start_min, 0)
            .unwrap(),
        Utc.with_ymd_and_hms(2023, 6, 27, end_hour, end_min, 0)
            .unwrap(),
    )
    .unwrap()
}

fn scheduler() -> Scheduler<InMemoryStore> {
    Scheduler::new(InMemoryStore::new())
}

fn dentist() -> RoomName {
    RoomName::new("Dentist")
}

fn osteopath() -> RoomName {
    RoomName::new("Osteopath")
}

fn expect_conflict(result: Result<Appointment>) -> (ResourceKind, AppointmentId) {
    match result {
        Err(GuardError::ResourceConflict(conflict)) => (conflict.kind, conflict.appointment),
        other => panic!("expected a resource conflict, got {:?}", other),
    }
}

// ── schedule ────────────────────────────────────────────────────────────────

#[test]
fn schedule_assigns_ids_and_persists() {
    let s = scheduler();

    let first = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();
    let second = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(18, 30, 20, 30))
        .unwrap();

    assert_eq!(first.id, AppointmentId(1));
    assert_eq!(second.id, AppointmentId(2));
    assert_eq!(first.status, AppointmentStatus::Scheduled);

    let listed = s
        .store()
        .list_active_appointments(&ResourceKey::Room(dentist()))
        .unwrap();
    assert_eq!(listed, vec![first, second]);
}

#[test]
fn schedule_rejects_room_double_booking() {
    let s = scheduler();
    let first = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();

    let result = s.schedule(PatientId(2), DoctorId(2), dentist(), interval(16, 0, 17, 0));

    assert_eq!(expect_conflict(result), (ResourceKind::Room, first.id));
    assert_eq!(s.store().all().unwrap().len(), 1, "nothing committed");
}

#[test]
fn schedule_rejects_doctor_in_two_rooms() {
    let s = scheduler();
    let first = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();

    let result = s.schedule(PatientId(2), DoctorId(1), osteopath(), interval(15, 30, 16, 30));

    assert_eq!(expect_conflict(result), (ResourceKind::Doctor, first.id));
}

#[test]
fn schedule_rejects_patient_in_two_rooms() {
    let s = scheduler();
    let first = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();

    let result = s.schedule(PatientId(1), DoctorId(2), osteopath(), interval(16, 30, 17, 0));

    assert_eq!(expect_conflict(result), (ResourceKind::Patient, first.id));
}

#[test]
fn schedule_allows_unrelated_resources_at_same_time() {
    let s = scheduler();
    s.schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();

    let parallel = s.schedule(PatientId(2), DoctorId(2), osteopath(), interval(15, 30, 16, 30));
    assert!(parallel.is_ok());
}

// ── reschedule ──────────────────────────────────────────────────────────────

#[test]
fn reschedule_over_own_slot_accepted() {
    let s = scheduler();
    let appt = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();

    let moved = s.reschedule(appt.id, interval(16, 0, 17, 0)).unwrap();

    assert_eq!(moved.id, appt.id);
    assert_eq!(moved.interval, interval(16, 0, 17, 0));
    assert_eq!(
        s.store().find(appt.id).unwrap().unwrap().interval,
        interval(16, 0, 17, 0)
    );
}

#[test]
fn reschedule_into_other_booking_rejected_and_unchanged() {
    let s = scheduler();
    let a = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();
    let b = s
        .schedule(PatientId(2), DoctorId(2), dentist(), interval(18, 0, 19, 0))
        .unwrap();

    let result = s.reschedule(a.id, interval(17, 30, 18, 0));

    assert_eq!(expect_conflict(result), (ResourceKind::Room, b.id));
    assert_eq!(
        s.store().find(a.id).unwrap().unwrap().interval,
        interval(15, 30, 16, 30)
    );
}

#[test]
fn reschedule_unknown_appointment_fails() {
    let s = scheduler();
    let err = s
        .reschedule(AppointmentId(42), interval(9, 0, 10, 0))
        .unwrap_err();
    assert_eq!(err, GuardError::UnknownAppointment(AppointmentId(42)));
}

// ── cancel ──────────────────────────────────────────────────────────────────

#[test]
fn cancel_frees_resources() {
    let s = scheduler();
    let appt = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();

    let cancelled = s.cancel(appt.id).unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let rebooked = s.schedule(PatientId(2), DoctorId(1), dentist(), interval(15, 30, 16, 30));
    assert!(rebooked.is_ok(), "cancelled slot must be free again");
    assert!(s
        .store()
        .list_active_appointments(&ResourceKey::Patient(PatientId(1)))
        .unwrap()
        .is_empty());
}

#[test]
fn cancel_twice_fails() {
    let s = scheduler();
    let appt = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();
    s.cancel(appt.id).unwrap();

    assert_eq!(
        s.cancel(appt.id).unwrap_err(),
        GuardError::AlreadyCancelled(appt.id)
    );
    assert_eq!(
        s.reschedule(appt.id, interval(9, 0, 10, 0)).unwrap_err(),
        GuardError::AlreadyCancelled(appt.id)
    );
}

// ── check (dry run) ─────────────────────────────────────────────────────────

#[test]
fn check_does_not_commit() {
    let s = scheduler();
    let appt = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();

    let free = Candidate::new(PatientId(2), DoctorId(2), dentist(), interval(17, 0, 18, 0));
    assert_eq!(s.check(&free).unwrap(), Decision::Accepted);

    let clash = Candidate::new(PatientId(2), DoctorId(2), dentist(), interval(16, 30, 17, 0));
    assert!(!s.check(&clash).unwrap().is_accepted());

    let own = Candidate::reschedule_of(&appt, interval(15, 0, 16, 0));
    assert_eq!(s.check(&own).unwrap(), Decision::Accepted);

    assert_eq!(s.store().all().unwrap().len(), 1);
}

#[test]
fn check_all_reports_every_conflict_without_committing() {
    let s = scheduler();
    let room_clash = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();
    let doctor_clash = s
        .schedule(PatientId(2), DoctorId(2), osteopath(), interval(16, 0, 17, 0))
        .unwrap();

    let candidate = Candidate::new(PatientId(3), DoctorId(2), dentist(), interval(16, 30, 17, 0));
    let conflicts = s.check_all(&candidate).unwrap();

    let found: Vec<_> = conflicts.iter().map(|c| (c.kind, c.appointment)).collect();
    assert_eq!(
        found,
        vec![
            (ResourceKind::Room, room_clash.id),
            (ResourceKind::Doctor, doctor_clash.id),
        ]
    );
    assert_eq!(conflicts[0].overlap_minutes, 0);
    assert_eq!(s.store().all().unwrap().len(), 2);

    let free = Candidate::new(PatientId(3), DoctorId(3), dentist(), interval(17, 0, 18, 0));
    assert!(s.check_all(&free).unwrap().is_empty());
}

// ── Seeded store ────────────────────────────────────────────────────────────

#[test]
fn seeded_store_continues_ids_and_skips_cancelled() {
    let cancelled = Appointment {
        id: AppointmentId(9),
        patient: PatientId(1),
        doctor: DoctorId(1),
        room: dentist(),
        interval: interval(15, 30, 16, 30),
        status: AppointmentStatus::Cancelled,
    };
    let s = Scheduler::new(InMemoryStore::from_appointments(vec![cancelled]).unwrap());

    let appt = s
        .schedule(PatientId(1), DoctorId(1), dentist(), interval(15, 30, 16, 30))
        .unwrap();
    assert_eq!(appt.id, AppointmentId(10));
}

#[test]
fn seeded_store_rejects_duplicate_ids() {
    let dentist_slot = Appointment {
        id: AppointmentId(1),
        patient: PatientId(1),
        doctor: DoctorId(1),
        room: dentist(),
        interval: interval(9, 0, 10, 0),
        status: AppointmentStatus::Scheduled,
    };
    let osteopath_slot = Appointment {
        room: osteopath(),
        interval: interval(14, 0, 15, 0),
        ..dentist_slot.clone()
    };

    let err = InMemoryStore::from_appointments(vec![dentist_slot, osteopath_slot]).unwrap_err();
    assert_eq!(err, GuardError::DuplicateAppointment(AppointmentId(1)));
}

#[test]
fn seeded_store_rejects_duplicate_id_even_when_cancelled() {
    let active = Appointment {
        id: AppointmentId(3),
        patient: PatientId(1),
        doctor: DoctorId(1),
        room: dentist(),
        interval: interval(9, 0, 10, 0),
        status: AppointmentStatus::Scheduled,
    };
    let cancelled = Appointment {
        status: AppointmentStatus::Cancelled,
        ..active.clone()
    };

    let err = InMemoryStore::from_appointments(vec![cancelled, active]).unwrap_err();
    assert_eq!(err, GuardError::DuplicateAppointment(AppointmentId(3)));
}

#[test]
fn insert_fails_once_ids_are_exhausted() {
    let last = Appointment {
        id: AppointmentId(u64::MAX),
        patient: PatientId(1),
        doctor: DoctorId(1),
        room: dentist(),
        interval: interval(9, 0, 10, 0),
        status: AppointmentStatus::Scheduled,
    };
    let s = Scheduler::new(InMemoryStore::from_appointments(vec![last]).unwrap());

    let err = s
        .schedule(PatientId(2), DoctorId(2), osteopath(), interval(15, 30, 16, 30))
        .unwrap_err();

    assert_eq!(err, GuardError::Store("appointment ids exhausted".to_string()));
    assert_eq!(s.store().all().unwrap().len(), 1, "nothing committed");
    assert!(s
        .store()
        .list_active_appointments(&ResourceKey::Room(osteopath()))
        .unwrap()
        .is_empty());
}

// ── Concurrency ─────────────────────────────────────────────────────────────

#[test]
fn concurrent_overlapping_bookings_admit_exactly_one() {
    const THREADS: usize = 8;
    let s = Arc::new(scheduler());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let s = Arc::clone(&s);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                // Different patients and doctors, same room, staggered overlap.
                let offset = Duration::minutes(i as i64 * 5);
                let base = interval(15, 0, 16, 0);
                let slot = TimeInterval::new(
                    base.starts_at() + offset,
                    base.finishes_at() + offset,
                )
                .unwrap();
                s.schedule(PatientId(i as u64), DoctorId(i as u64), dentist(), slot)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let admitted = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(admitted, 1, "exactly one booking may hold the room");
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, GuardError::ResourceConflict(_))));
    assert!(find_violations(&s.store().all().unwrap()).is_empty());
}

#[test]
fn concurrent_disjoint_bookings_all_admitted() {
    const THREADS: usize = 8;
    let s = Arc::new(scheduler());

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let s = Arc::clone(&s);
            thread::spawn(move || {
                s.schedule(
                    PatientId(i as u64),
                    DoctorId(i as u64),
                    RoomName::new(format!("Room {}", i)),
                    interval(15, 30, 16, 30),
                )
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    assert_eq!(s.store().all().unwrap().len(), THREADS);
}

// ── Resource locks ──────────────────────────────────────────────────────────

#[test]
fn lease_holds_keys_until_dropped() {
    let locks = ResourceLocks::new();
    let room = ResourceKey::Room(dentist());
    let doctor = ResourceKey::Doctor(DoctorId(1));

    {
        let lease = locks
            .acquire([room.clone(), doctor.clone(), room.clone()])
            .unwrap();
        assert_eq!(lease.keys().count(), 2, "duplicate keys collapse");
        assert!(locks.is_held(&room).unwrap());
        assert!(locks.is_held(&doctor).unwrap());
        assert!(!locks.is_held(&ResourceKey::Patient(PatientId(1))).unwrap());
    }

    assert!(!locks.is_held(&room).unwrap());
    assert!(!locks.is_held(&doctor).unwrap());
}

#[test]
fn overlapping_lease_waits_for_release() {
    let locks = Arc::new(ResourceLocks::new());
    let room = ResourceKey::Room(dentist());

    let lease = locks.acquire([room.clone()]).unwrap();

    let waiter = {
        let locks = Arc::clone(&locks);
        let room = room.clone();
        thread::spawn(move || {
            let _lease = locks
                .acquire([room, ResourceKey::Doctor(DoctorId(2))])
                .unwrap();
        })
    };

    thread::sleep(std::time::Duration::from_millis(50));
    assert!(!waiter.is_finished(), "second lease must wait on the room");
    drop(lease);
    waiter.join().unwrap();
    assert_eq!(locks.is_held(&room), Ok(false));
}
