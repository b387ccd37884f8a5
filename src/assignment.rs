//! Care assignment: linking a patient's medical record to one attending
//! doctor. A record carries at most one assigned doctor at a time; assigning
//! over an existing link or unassigning a bare record is a typed error, never
//! a silent no-op.

use thiserror::Error;

use crate::db::{Store, StoreError};

#[derive(Error, Debug)]
pub enum AssignmentError {
    #[error("no doctor with id {0}")]
    UnknownDoctor(String),

    #[error("no medical record for patient {0}")]
    RecordNotFound(String),

    #[error("patient {patient_id} is already assigned to doctor {doctor_id}")]
    AlreadyAssigned { patient_id: String, doctor_id: String },

    #[error("patient {0} has no assigned doctor")]
    NotAssigned(String),

    #[error("patient {patient_id} is not assigned to doctor {doctor_id}")]
    NotAssignedTo { patient_id: String, doctor_id: String },

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// Assigns a doctor to the patient's medical record. Fails if the record
/// already has an assigned doctor, including the same one; callers wanting
/// to move a patient unassign first.
pub fn assign_doctor(
    store: &mut Store,
    doctor_id: &str,
    patient_id: &str,
) -> Result<(), AssignmentError> {
    if store.doctor(doctor_id).is_none() {
        return Err(AssignmentError::UnknownDoctor(doctor_id.into()));
    }
    let record = store
        .medical_record(patient_id)
        .ok_or_else(|| AssignmentError::RecordNotFound(patient_id.into()))?;
    if let Some(current) = &record.assigned_doctor_id {
        return Err(AssignmentError::AlreadyAssigned {
            patient_id: patient_id.into(),
            doctor_id: current.clone(),
        });
    }

    store.update_medical_record(patient_id, |r| {
        r.assigned_doctor_id = Some(doctor_id.to_string());
    })?;
    tracing::info!(doctor_id, patient_id, "doctor assigned");
    Ok(())
}

/// Clears the patient's assigned doctor. The caller names the doctor being
/// unassigned; a record assigned to someone else is left untouched.
pub fn unassign_doctor(
    store: &mut Store,
    doctor_id: &str,
    patient_id: &str,
) -> Result<(), AssignmentError> {
    let record = store
        .medical_record(patient_id)
        .ok_or_else(|| AssignmentError::RecordNotFound(patient_id.into()))?;
    match record.assigned_doctor_id.as_deref() {
        None => return Err(AssignmentError::NotAssigned(patient_id.into())),
        Some(current) if current != doctor_id => {
            return Err(AssignmentError::NotAssignedTo {
                patient_id: patient_id.into(),
                doctor_id: doctor_id.into(),
            });
        }
        Some(_) => {}
    }

    store.update_medical_record(patient_id, |r| {
        r.assigned_doctor_id = None;
    })?;
    tracing::info!(doctor_id, patient_id, "doctor unassigned");
    Ok(())
}

/// Patients whose records are assigned to the given doctor.
pub fn patients_of_doctor<'a>(store: &'a Store, doctor_id: &str) -> Vec<&'a str> {
    store
        .medical_records()
        .iter()
        .filter(|r| r.assigned_doctor_id.as_deref() == Some(doctor_id))
        .map(|r| r.patient_id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactInfo, MedicalRecord, Role, User};
    use chrono::NaiveDate;

    fn user(id: &str, role: Role) -> User {
        User {
            hospital_id: id.into(),
            password_hash: "x".into(),
            name: format!("User {id}"),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
            gender: "F".into(),
            contact: ContactInfo { phone: "555".into(), email: format!("{id}@hospital.test") },
            role,
        }
    }

    fn record(patient_id: &str) -> MedicalRecord {
        MedicalRecord {
            patient_id: patient_id.into(),
            name: format!("User {patient_id}"),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
            gender: "F".into(),
            contact: ContactInfo { phone: "555".into(), email: "p@x".into() },
            blood_type: "A+".into(),
            diagnoses: Vec::new(),
            treatments: Vec::new(),
            assigned_doctor_id: None,
        }
    }

    fn setup(dir: &std::path::Path) -> Store {
        let mut store = Store::open(dir).unwrap();
        store.add_user(user("D1", Role::Doctor)).unwrap();
        store.add_user(user("D2", Role::Doctor)).unwrap();
        store.add_user(user("P1", Role::Patient)).unwrap();
        store.add_medical_record(record("P1")).unwrap();
        store
    }

    #[test]
    fn assign_then_unassign_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = setup(tmp.path());

        assign_doctor(&mut store, "D1", "P1").unwrap();
        assert_eq!(store.medical_record("P1").unwrap().assigned_doctor_id.as_deref(), Some("D1"));
        assert_eq!(patients_of_doctor(&store, "D1"), vec!["P1"]);

        unassign_doctor(&mut store, "D1", "P1").unwrap();
        assert!(store.medical_record("P1").unwrap().assigned_doctor_id.is_none());
        assert!(patients_of_doctor(&store, "D1").is_empty());
    }

    #[test]
    fn unassign_by_different_doctor_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = setup(tmp.path());
        assign_doctor(&mut store, "D1", "P1").unwrap();

        let err = unassign_doctor(&mut store, "D2", "P1").unwrap_err();
        assert!(matches!(err, AssignmentError::NotAssignedTo { .. }));
        assert_eq!(store.medical_record("P1").unwrap().assigned_doctor_id.as_deref(), Some("D1"));
    }

    #[test]
    fn double_assignment_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = setup(tmp.path());
        assign_doctor(&mut store, "D1", "P1").unwrap();

        // Rejected even for the same doctor; the existing link is untouched.
        let err = assign_doctor(&mut store, "D2", "P1").unwrap_err();
        assert!(matches!(err, AssignmentError::AlreadyAssigned { .. }));
        let err = assign_doctor(&mut store, "D1", "P1").unwrap_err();
        assert!(matches!(err, AssignmentError::AlreadyAssigned { .. }));
        assert_eq!(store.medical_record("P1").unwrap().assigned_doctor_id.as_deref(), Some("D1"));
    }

    #[test]
    fn unassign_without_assignment_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = setup(tmp.path());
        let err = unassign_doctor(&mut store, "D1", "P1").unwrap_err();
        assert!(matches!(err, AssignmentError::NotAssigned(_)));
    }

    #[test]
    fn assignment_needs_doctor_and_record() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = setup(tmp.path());

        let err = assign_doctor(&mut store, "P1", "P1").unwrap_err();
        assert!(matches!(err, AssignmentError::UnknownDoctor(_)));

        let err = assign_doctor(&mut store, "D1", "P404").unwrap_err();
        assert!(matches!(err, AssignmentError::RecordNotFound(_)));
    }

    #[test]
    fn assignment_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut store = setup(tmp.path());
            assign_doctor(&mut store, "D2", "P1").unwrap();
        }
        let store = Store::open(tmp.path()).unwrap();
        assert_eq!(store.medical_record("P1").unwrap().assigned_doctor_id.as_deref(), Some("D2"));
    }
}
