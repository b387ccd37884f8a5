use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::PrescriptionStatus;
use super::user::ContactInfo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub medication: String,
    pub dosage: String,
    pub status: PrescriptionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub date: NaiveDate,
    pub description: String,
    pub prescriptions: Vec<Prescription>,
}

/// Comprehensive medical information for one patient. Exactly one record per
/// patient; created once and mutated by diagnosis/treatment/prescription
/// additions and doctor assignment, never deleted in normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub patient_id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub contact: ContactInfo,
    pub blood_type: String,
    pub diagnoses: Vec<Diagnosis>,
    pub treatments: Vec<Treatment>,
    pub assigned_doctor_id: Option<String>,
}

impl MedicalRecord {
    pub fn add_diagnosis(&mut self, diagnosis: Diagnosis) {
        self.diagnoses.push(diagnosis);
    }

    pub fn add_treatment(&mut self, treatment: Treatment) {
        self.treatments.push(treatment);
    }

    /// Attaches a prescription to the most recent treatment, creating a bare
    /// treatment first when the record has none.
    pub fn add_prescription(&mut self, date: NaiveDate, prescription: Prescription) {
        if self.treatments.is_empty() {
            self.treatments.push(Treatment {
                date,
                description: String::new(),
                prescriptions: Vec::new(),
            });
        }
        // Non-empty by the guard above.
        if let Some(last) = self.treatments.last_mut() {
            last.prescriptions.push(prescription);
        }
    }
}
