//! `clinic` CLI: check a booking against a ledger, or audit a ledger for
//! double-booked rooms, doctors and patients.
//!
//! ## Usage
//!
//! ```sh
//! # Would this booking fit? (ledger read from a file)
//! clinic check --ledger ledger.json --patient 1 --doctor 1 --room Dentist \
//!     --starts-at "15:30 27/06/2023" --finishes-at "16:30 27/06/2023"
//!
//! # Move appointment 3; its own slot does not count against it
//! clinic check --ledger ledger.json --reschedule 3 \
//!     --starts-at 2023-06-27T16:00:00Z --finishes-at 2023-06-27T17:00:00Z
//!
//! # Front-desk times in a local timezone, listing every conflict
//! clinic check -l ledger.json --patient 1 --doctor 1 --room Dentist \
//!     --starts-at "09:00 27/06/2023" --finishes-at "10:00 27/06/2023" \
//!     --timezone Europe/Madrid --all
//!
//! # Audit a ledger piped on stdin
//! cat ledger.json | clinic audit
//! ```
//!
//! Exit status: 0 when accepted / clean, 3 when the booking is rejected or
//! the ledger has violations, 1 on invalid input.

mod time;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clinic_guard::{
    find_violations, Appointment, AppointmentId, AppointmentStore, Candidate, Conflict, Decision,
    DoctorId, InMemoryStore, PatientId, RoomName, Scheduler, TimeInterval,
};
use std::io::{self, Read};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status for a rejected booking or a ledger with violations.
const EXIT_CONFLICT: i32 = 3;

#[derive(Parser)]
#[command(name = "clinic", version, about = "Clinic booking conflict checker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a booking can be admitted against a ledger
    Check {
        /// Ledger JSON file (reads from stdin if omitted or "-")
        #[arg(short, long)]
        ledger: Option<String>,
        /// Patient id
        #[arg(long, required_unless_present = "reschedule")]
        patient: Option<u64>,
        /// Doctor id
        #[arg(long, required_unless_present = "reschedule")]
        doctor: Option<u64>,
        /// Room name
        #[arg(long, required_unless_present = "reschedule")]
        room: Option<String>,
        /// Start: RFC 3339 or "HH:MM DD/MM/YYYY" in --timezone
        #[arg(long)]
        starts_at: String,
        /// Finish: RFC 3339 or "HH:MM DD/MM/YYYY" in --timezone
        #[arg(long)]
        finishes_at: String,
        /// Move this existing appointment instead of booking a new one
        #[arg(long, conflicts_with_all = ["patient", "doctor", "room"])]
        reschedule: Option<u64>,
        /// IANA timezone for clinic-format timestamps
        #[arg(long, default_value = "UTC")]
        timezone: String,
        /// Report every conflict instead of the first
        #[arg(long)]
        all: bool,
    },
    /// Report every double-booking in a ledger
    Audit {
        /// Ledger JSON file (reads from stdin if omitted or "-")
        #[arg(short, long)]
        ledger: Option<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let clean = match cli.command {
        Commands::Check {
            ledger,
            patient,
            doctor,
            room,
            starts_at,
            finishes_at,
            reschedule,
            timezone,
            all,
        } => {
            let tz = time::parse_timezone(&timezone)?;
            let interval = TimeInterval::new(
                time::parse_timestamp(&starts_at, tz)?,
                time::parse_timestamp(&finishes_at, tz)?,
            )
            .context("Invalid booking interval")?;

            let appointments = read_ledger(ledger.as_deref())?;
            let scheduler = Scheduler::new(InMemoryStore::from_appointments(appointments)?);

            let candidate = match reschedule {
                Some(id) => {
                    let existing = scheduler
                        .store()
                        .find(AppointmentId(id))?
                        .with_context(|| format!("Appointment {} is not in the ledger", id))?;
                    if !existing.is_active() {
                        bail!("Appointment {} is cancelled and cannot be moved", id);
                    }
                    Candidate::reschedule_of(&existing, interval)
                }
                None => Candidate::new(
                    PatientId(patient.context("--patient is required")?),
                    DoctorId(doctor.context("--doctor is required")?),
                    RoomName::new(room.context("--room is required")?),
                    interval,
                ),
            };

            let conflicts = if all {
                scheduler.check_all(&candidate)?
            } else {
                match scheduler.check(&candidate)? {
                    Decision::Accepted => Vec::new(),
                    Decision::Rejected(conflict) => vec![conflict],
                }
            };
            report_decision(&conflicts)
        }
        Commands::Audit { ledger } => {
            let store = InMemoryStore::from_appointments(read_ledger(ledger.as_deref())?)?;
            let appointments = store.all()?;
            let violations = find_violations(&appointments);
            if violations.is_empty() {
                println!("ok: {} appointments, no conflicts", appointments.len());
            }
            for v in &violations {
                println!(
                    "conflict: {} double-booked by appointments {} and {} ({} min overlap)",
                    v.resource, v.first, v.second, v.overlap_minutes
                );
            }
            violations.is_empty()
        }
    };

    if !clean {
        process::exit(EXIT_CONFLICT);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

/// Print the outcome of a check. Returns `true` when the booking is accepted.
fn report_decision(conflicts: &[Conflict]) -> bool {
    if conflicts.is_empty() {
        println!("accepted");
        return true;
    }
    for c in conflicts {
        println!("rejected: {}", c);
    }
    false
}

fn read_ledger(path: Option<&str>) -> Result<Vec<Appointment>> {
    let raw = read_input(path)?;
    let appointments: Vec<Appointment> =
        serde_json::from_str(&raw).context("Failed to parse ledger JSON")?;
    debug!(count = appointments.len(), "ledger loaded");
    Ok(appointments)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) if path != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
