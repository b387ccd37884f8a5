use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A half-open time interval used both for declared availability and for
/// booked appointments.
///
/// Two slots are equal iff start and end match exactly; the availability flag
/// is carried for display but never takes part in identity. Partial overlap
/// between unequal slots is not treated as a conflict anywhere in this crate —
/// availability declarations are validated against overlap at the source
/// instead (see `availability::declare_availability`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub available: bool,
}

impl TimeSlot {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end, available: true }
    }

    /// Calendar date the slot falls on (taken from its start).
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Half-open interval overlap test.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl PartialEq for TimeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl Eq for TimeSlot {}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.start.format("%Y-%m-%d"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// One doctor's declared availability, keyed by calendar date. Dates are kept
/// ordered so the schedules file serializes deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub doctor_id: String,
    pub days: BTreeMap<NaiveDate, Vec<TimeSlot>>,
}

impl DoctorSchedule {
    pub fn new(doctor_id: impl Into<String>) -> Self {
        Self { doctor_id: doctor_id.into(), days: BTreeMap::new() }
    }

    /// Declared slots for a date, empty when none were declared.
    pub fn slots_on(&self, date: NaiveDate) -> &[TimeSlot] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }
}
