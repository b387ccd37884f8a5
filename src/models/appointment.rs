use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;
use super::slot::TimeSlot;

/// A booked (or requested, cancelled, completed...) appointment. Appointments
/// are never physically deleted: cancellation and decline are status
/// transitions so the history stays auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Monotonically assigned, unique for the lifetime of the store.
    pub id: u32,
    pub patient_id: String,
    pub doctor_id: String,
    pub slot: TimeSlot,
    pub status: AppointmentStatus,
    /// Free-text outcome record, empty until the doctor completes the visit.
    pub outcome: String,
}

impl Appointment {
    /// Whether this appointment currently occupies its slot.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
