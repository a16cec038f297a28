//! Timestamp parsing for command-line arguments.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Wall-clock format used at the front desk, e.g. `15:30 27/06/2023`.
pub const CLINIC_FORMAT: &str = "%H:%M %d/%m/%Y";

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {}", name, e))
}

/// Parse an RFC 3339 timestamp, or a clinic-format local time in `tz`.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, CLINIC_FORMAT).with_context(|| {
        format!(
            "Invalid timestamp '{}': expected RFC 3339 or 'HH:MM DD/MM/YYYY'",
            raw
        )
    })?;

    match tz.from_local_datetime(&naive).single() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => bail!(
            "Local time '{}' is ambiguous or does not exist in {}",
            raw,
            tz
        ),
    }
}
