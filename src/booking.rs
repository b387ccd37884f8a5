//! Booking engine: the appointment status machine and its validation rules.
//!
//! Status lifecycle: `Pending -> Scheduled -> Rescheduled -> (Cancelled |
//! Completed)`, with `Declined` reachable from `Pending` and `Cancelled`
//! reachable from any active state. Every operation re-validates against
//! fresh availability at commit time, so a slot listed a moment ago can
//! still be refused here — that re-check closes the race between listing
//! slots and booking one.

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::availability::available_slots;
use crate::db::{Store, StoreError};
use crate::models::{Appointment, AppointmentStatus, Role, TimeSlot};
use crate::notify::Notifier;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("slot {slot} is not available for doctor {doctor_id}")]
    SlotUnavailable { doctor_id: String, slot: TimeSlot },

    #[error("slot {slot} does not fall on {date}")]
    WrongDate { slot: TimeSlot, date: NaiveDate },

    #[error("no user {id} with role {role}")]
    UnknownUser { id: String, role: Role },

    #[error("appointment {0} not found")]
    AppointmentNotFound(u32),

    #[error("appointment {id} does not belong to {caller_id}")]
    NotOwned { id: u32, caller_id: String },

    #[error("appointment {id} cannot transition from {from}")]
    InvalidTransition { id: u32, from: AppointmentStatus },

    #[error("cannot book or reschedule to past date {0}")]
    PastDate(NaiveDate),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

fn require_role(store: &Store, id: &str, role: Role) -> Result<(), BookingError> {
    match store.user(id) {
        Some(user) if user.role == role => Ok(()),
        _ => Err(BookingError::UnknownUser { id: id.into(), role }),
    }
}

/// The desired slot must fall on the requested date and be present in the
/// doctor's freshly recomputed availability.
fn require_available(
    store: &Store,
    doctor_id: &str,
    date: NaiveDate,
    slot: &TimeSlot,
) -> Result<(), BookingError> {
    if slot.date() != date {
        return Err(BookingError::WrongDate { slot: slot.clone(), date });
    }
    if !available_slots(store, doctor_id, date).contains(slot) {
        return Err(BookingError::SlotUnavailable {
            doctor_id: doctor_id.into(),
            slot: slot.clone(),
        });
    }
    Ok(())
}

fn create(
    store: &mut Store,
    notifier: &dyn Notifier,
    patient_id: &str,
    doctor_id: &str,
    date: NaiveDate,
    slot: TimeSlot,
    status: AppointmentStatus,
) -> Result<Appointment, BookingError> {
    require_role(store, patient_id, Role::Patient)?;
    require_role(store, doctor_id, Role::Doctor)?;
    require_available(store, doctor_id, date, &slot)?;

    let appointment = Appointment {
        id: store.next_appointment_id(),
        patient_id: patient_id.into(),
        doctor_id: doctor_id.into(),
        slot,
        status,
        outcome: String::new(),
    };
    store.add_appointment(appointment.clone())?;

    tracing::info!(id = appointment.id, patient_id, doctor_id, %date, status = %status, "appointment created");
    notifier.notify(&format!(
        "Appointment {} ({status}) for patient {patient_id} with doctor {doctor_id} at {}",
        appointment.id, appointment.slot
    ));
    Ok(appointment)
}

/// Books a slot directly into `Scheduled` status. The new id is one greater
/// than the highest id ever stored.
pub fn schedule_appointment(
    store: &mut Store,
    notifier: &dyn Notifier,
    patient_id: &str,
    doctor_id: &str,
    date: NaiveDate,
    slot: TimeSlot,
) -> Result<Appointment, BookingError> {
    create(store, notifier, patient_id, doctor_id, date, slot, AppointmentStatus::Scheduled)
}

/// Patient-initiated request: books the slot in `Pending` status, awaiting
/// the doctor's accept or decline. A pending appointment already occupies
/// its slot.
pub fn request_appointment(
    store: &mut Store,
    notifier: &dyn Notifier,
    patient_id: &str,
    doctor_id: &str,
    date: NaiveDate,
    slot: TimeSlot,
) -> Result<Appointment, BookingError> {
    create(store, notifier, patient_id, doctor_id, date, slot, AppointmentStatus::Pending)
}

fn owned_by_patient(store: &Store, patient_id: &str, id: u32) -> Result<Appointment, BookingError> {
    let appt = store.appointment(id).ok_or(BookingError::AppointmentNotFound(id))?;
    if appt.patient_id != patient_id {
        return Err(BookingError::NotOwned { id, caller_id: patient_id.into() });
    }
    Ok(appt.clone())
}

fn owned_by_doctor(store: &Store, doctor_id: &str, id: u32) -> Result<Appointment, BookingError> {
    let appt = store.appointment(id).ok_or(BookingError::AppointmentNotFound(id))?;
    if appt.doctor_id != doctor_id {
        return Err(BookingError::NotOwned { id, caller_id: doctor_id.into() });
    }
    Ok(appt.clone())
}

/// Moves an existing appointment to a new slot (and optionally a new doctor),
/// preserving its id and patient. The appointment must be active, the new
/// date must not be in the past, and the new slot must be available on the
/// target doctor's freshly recomputed schedule.
pub fn reschedule_appointment(
    store: &mut Store,
    notifier: &dyn Notifier,
    patient_id: &str,
    id: u32,
    new_date: NaiveDate,
    new_doctor_id: Option<&str>,
    new_slot: TimeSlot,
) -> Result<Appointment, BookingError> {
    let mut appt = owned_by_patient(store, patient_id, id)?;
    if !appt.is_active() {
        return Err(BookingError::InvalidTransition { id, from: appt.status });
    }
    if new_date < Local::now().date_naive() {
        return Err(BookingError::PastDate(new_date));
    }

    let doctor_id = new_doctor_id.unwrap_or(&appt.doctor_id).to_string();
    require_role(store, &doctor_id, Role::Doctor)?;
    require_available(store, &doctor_id, new_date, &new_slot)?;

    appt.doctor_id = doctor_id.clone();
    appt.slot = new_slot;
    appt.status = AppointmentStatus::Rescheduled;
    store.update_appointment(appt.clone())?;

    tracing::info!(id, patient_id, doctor_id = %doctor_id, %new_date, "appointment rescheduled");
    notifier.notify(&format!(
        "Appointment {id} for patient {patient_id} rescheduled to {} with doctor {doctor_id}",
        appt.slot
    ));
    Ok(appt)
}

/// Patient-side cancellation. Soft delete only: the appointment stays in the
/// store with status `Cancelled`, which frees its slot and keeps history.
pub fn cancel_appointment(
    store: &mut Store,
    notifier: &dyn Notifier,
    patient_id: &str,
    id: u32,
) -> Result<Appointment, BookingError> {
    let mut appt = owned_by_patient(store, patient_id, id)?;
    if !appt.is_active() {
        return Err(BookingError::InvalidTransition { id, from: appt.status });
    }
    appt.status = AppointmentStatus::Cancelled;
    store.update_appointment(appt.clone())?;

    tracing::info!(id, patient_id, "appointment cancelled");
    notifier.notify(&format!("Appointment {id} for patient {patient_id} cancelled"));
    Ok(appt)
}

/// Doctor accepts a pending request, confirming it into `Scheduled`.
pub fn accept_appointment(
    store: &mut Store,
    notifier: &dyn Notifier,
    doctor_id: &str,
    id: u32,
) -> Result<Appointment, BookingError> {
    let mut appt = owned_by_doctor(store, doctor_id, id)?;
    if appt.status != AppointmentStatus::Pending {
        return Err(BookingError::InvalidTransition { id, from: appt.status });
    }
    appt.status = AppointmentStatus::Scheduled;
    store.update_appointment(appt.clone())?;

    tracing::info!(id, doctor_id, "appointment accepted");
    notifier.notify(&format!("Appointment {id} accepted by doctor {doctor_id}"));
    Ok(appt)
}

/// Doctor-side rejection of a pending request.
pub fn decline_appointment(
    store: &mut Store,
    notifier: &dyn Notifier,
    doctor_id: &str,
    id: u32,
) -> Result<Appointment, BookingError> {
    let mut appt = owned_by_doctor(store, doctor_id, id)?;
    if appt.status != AppointmentStatus::Pending {
        return Err(BookingError::InvalidTransition { id, from: appt.status });
    }
    appt.status = AppointmentStatus::Declined;
    store.update_appointment(appt.clone())?;

    tracing::info!(id, doctor_id, "appointment declined");
    notifier.notify(&format!("Appointment {id} declined by doctor {doctor_id}"));
    Ok(appt)
}

/// Doctor records the visit outcome and closes the appointment.
pub fn complete_appointment(
    store: &mut Store,
    notifier: &dyn Notifier,
    doctor_id: &str,
    id: u32,
    outcome: &str,
) -> Result<Appointment, BookingError> {
    let mut appt = owned_by_doctor(store, doctor_id, id)?;
    if !matches!(appt.status, AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled) {
        return Err(BookingError::InvalidTransition { id, from: appt.status });
    }
    appt.status = AppointmentStatus::Completed;
    appt.outcome = outcome.to_string();
    store.update_appointment(appt.clone())?;

    tracing::info!(id, doctor_id, "appointment completed");
    notifier.notify(&format!("Appointment {id} completed by doctor {doctor_id}"));
    Ok(appt)
}

// ─── Queries ──────────────────────────────────────────────────────────────────

pub fn appointments_for_patient<'a>(store: &'a Store, patient_id: &str) -> Vec<&'a Appointment> {
    store.appointments().iter().filter(|a| a.patient_id == patient_id).collect()
}

pub fn appointments_for_doctor<'a>(store: &'a Store, doctor_id: &str) -> Vec<&'a Appointment> {
    store.appointments().iter().filter(|a| a.doctor_id == doctor_id).collect()
}

pub fn pending_for_doctor<'a>(store: &'a Store, doctor_id: &str) -> Vec<&'a Appointment> {
    store
        .appointments()
        .iter()
        .filter(|a| a.doctor_id == doctor_id && a.status == AppointmentStatus::Pending)
        .collect()
}

/// Appointments for a doctor that start in the future and are still live
/// (not declined or cancelled).
pub fn upcoming_for_doctor<'a>(store: &'a Store, doctor_id: &str) -> Vec<&'a Appointment> {
    let now = Local::now().naive_local();
    store
        .appointments()
        .iter()
        .filter(|a| {
            a.doctor_id == doctor_id
                && a.slot.start > now
                && !matches!(a.status, AppointmentStatus::Declined | AppointmentStatus::Cancelled)
        })
        .collect()
}
