//! Availability resolution: declared slots minus booked slots.

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::{Store, StoreError};
use crate::models::TimeSlot;

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("user {0} is not a doctor")]
    NotADoctor(String),

    #[error("slot {slot} does not fall on {date}")]
    WrongDate { slot: TimeSlot, date: NaiveDate },

    #[error("invalid slot: start {0} is not before its end")]
    InvalidSlot(TimeSlot),

    #[error("declared slots overlap: {0} and {1}")]
    Overlap(TimeSlot, TimeSlot),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// Bookable slots for a doctor on a date: the declared availability minus
/// every slot exactly matched (start+end equality) by one of the doctor's
/// active appointments that day. Declaration order is preserved.
///
/// An empty result means either "nothing declared" or "fully booked"; callers
/// that need to tell these apart check `Store::declared_slots` as well.
pub fn available_slots(store: &Store, doctor_id: &str, date: NaiveDate) -> Vec<TimeSlot> {
    let declared = store.declared_slots(doctor_id, date);
    if declared.is_empty() {
        return Vec::new();
    }

    let booked: Vec<&TimeSlot> = store
        .appointments()
        .iter()
        .filter(|a| a.doctor_id == doctor_id && a.is_active() && a.slot.date() == date)
        .map(|a| &a.slot)
        .collect();

    declared.iter().filter(|slot| !booked.iter().any(|b| *b == *slot)).cloned().collect()
}

/// Replaces a doctor's declared availability for one date and persists it.
/// Slots are stored sorted by start time; each must be well-formed, fall on
/// the given date, and not overlap another declared slot for that date.
pub fn declare_availability(
    store: &mut Store,
    doctor_id: &str,
    date: NaiveDate,
    mut slots: Vec<TimeSlot>,
) -> Result<(), AvailabilityError> {
    if store.doctor(doctor_id).is_none() {
        return Err(AvailabilityError::NotADoctor(doctor_id.into()));
    }
    for slot in &slots {
        if slot.start >= slot.end {
            return Err(AvailabilityError::InvalidSlot(slot.clone()));
        }
        if slot.date() != date || slot.end.date() != date {
            return Err(AvailabilityError::WrongDate { slot: slot.clone(), date });
        }
    }
    slots.sort_by_key(|s| s.start);
    for pair in slots.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(AvailabilityError::Overlap(pair[0].clone(), pair[1].clone()));
        }
    }

    store.set_availability(doctor_id, date, slots)?;
    tracing::info!(doctor_id, %date, "availability updated");
    Ok(())
}
