//! In-memory entity collections mirrored to flat files.
//!
//! The store owns four independently persisted collections: users,
//! appointments, medical records, and per-doctor schedules folded into one
//! schedules file. Every mutation persists exactly the affected collection's
//! file before returning; if the write fails the in-memory change is rolled
//! back, so memory and disk never diverge. Single logical writer: all
//! mutations take `&mut self`, callers needing threads wrap the store in one
//! mutex.

use chrono::NaiveDate;

use super::codec;
use super::file_store::FileStore;
use super::StoreError;
use crate::models::{
    Appointment, Diagnosis, DoctorSchedule, MedicalRecord, Prescription, PrescriptionStatus,
    TimeSlot, Treatment, User,
};

pub const USERS_FILE: &str = "users.txt";
pub const APPOINTMENTS_FILE: &str = "appts.txt";
pub const MEDICAL_RECORDS_FILE: &str = "medical_records.txt";
pub const SCHEDULES_FILE: &str = "schedules.txt";

pub struct Store {
    files: FileStore,
    users: Vec<User>,
    appointments: Vec<Appointment>,
    records: Vec<MedicalRecord>,
    schedules: Vec<DoctorSchedule>,
}

impl Store {
    /// Opens the store, loading all four files in fixed order. Schedules load
    /// last because a schedule line attaches to an already-loaded doctor.
    /// Malformed lines are skipped with a warning, never aborting the load.
    pub fn open(dir: impl Into<std::path::PathBuf>) -> Result<Self, StoreError> {
        let files = FileStore::open(dir)?;
        let mut store = Self {
            files,
            users: Vec::new(),
            appointments: Vec::new(),
            records: Vec::new(),
            schedules: Vec::new(),
        };
        store.load_users()?;
        store.load_appointments()?;
        store.load_medical_records()?;
        store.load_schedules()?;
        Ok(store)
    }

    fn load_users(&mut self) -> Result<(), StoreError> {
        for line in self.files.read_lines(USERS_FILE)? {
            match codec::decode_user(&line) {
                Ok(user) => self.users.push(user),
                Err(e) => tracing::warn!(file = USERS_FILE, line = %line, error = %e, "skipping malformed record"),
            }
        }
        Ok(())
    }

    fn load_appointments(&mut self) -> Result<(), StoreError> {
        for line in self.files.read_lines(APPOINTMENTS_FILE)? {
            match codec::decode_appointment(&line) {
                Ok(appt) => self.appointments.push(appt),
                Err(e) => tracing::warn!(file = APPOINTMENTS_FILE, line = %line, error = %e, "skipping malformed record"),
            }
        }
        Ok(())
    }

    fn load_medical_records(&mut self) -> Result<(), StoreError> {
        for line in self.files.read_lines(MEDICAL_RECORDS_FILE)? {
            match codec::decode_medical_record(&line) {
                Ok(record) => self.records.push(record),
                Err(e) => tracing::warn!(file = MEDICAL_RECORDS_FILE, line = %line, error = %e, "skipping malformed record"),
            }
        }
        Ok(())
    }

    fn load_schedules(&mut self) -> Result<(), StoreError> {
        for line in self.files.read_lines(SCHEDULES_FILE)? {
            match codec::decode_schedule_entry(&line) {
                Ok((doctor_id, date, slots)) => {
                    if self.doctor(&doctor_id).is_none() {
                        tracing::warn!(file = SCHEDULES_FILE, doctor_id = %doctor_id, line = %line, "schedule entry for unknown doctor, skipping");
                        continue;
                    }
                    self.schedule_entry_mut(&doctor_id).days.insert(date, slots);
                }
                Err(e) => tracing::warn!(file = SCHEDULES_FILE, line = %line, error = %e, "skipping malformed record"),
            }
        }
        Ok(())
    }

    // ─── Persistence ──────────────────────────────────────────────────────────

    fn persist_users(&self) -> Result<(), StoreError> {
        let lines: Vec<String> = self.users.iter().map(codec::encode_user).collect();
        self.files.write_lines(USERS_FILE, &lines)
    }

    fn persist_appointments(&self) -> Result<(), StoreError> {
        let lines: Vec<String> = self.appointments.iter().map(codec::encode_appointment).collect();
        self.files.write_lines(APPOINTMENTS_FILE, &lines)
    }

    fn persist_medical_records(&self) -> Result<(), StoreError> {
        let lines: Vec<String> = self.records.iter().map(codec::encode_medical_record).collect();
        self.files.write_lines(MEDICAL_RECORDS_FILE, &lines)
    }

    fn persist_schedules(&self) -> Result<(), StoreError> {
        let mut lines = Vec::new();
        for schedule in &self.schedules {
            for (date, slots) in &schedule.days {
                lines.push(codec::encode_schedule_entry(&schedule.doctor_id, *date, slots));
            }
        }
        self.files.write_lines(SCHEDULES_FILE, &lines)
    }

    // ─── Users ────────────────────────────────────────────────────────────────

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, hospital_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.hospital_id == hospital_id)
    }

    /// The user, if present and a doctor.
    pub fn doctor(&self, hospital_id: &str) -> Option<&User> {
        self.user(hospital_id).filter(|u| u.is_doctor())
    }

    /// The user, if present and a patient.
    pub fn patient(&self, hospital_id: &str) -> Option<&User> {
        self.user(hospital_id).filter(|u| u.is_patient())
    }

    pub fn doctors(&self) -> Vec<&User> {
        self.users.iter().filter(|u| u.is_doctor()).collect()
    }

    pub fn add_user(&mut self, user: User) -> Result<(), StoreError> {
        if self.user(&user.hospital_id).is_some() {
            return Err(StoreError::Duplicate {
                entity: "User".into(),
                id: user.hospital_id,
            });
        }
        self.users.push(user);
        if let Err(e) = self.persist_users() {
            self.users.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn remove_user(&mut self, hospital_id: &str) -> Result<(), StoreError> {
        let index = self
            .users
            .iter()
            .position(|u| u.hospital_id == hospital_id)
            .ok_or_else(|| StoreError::NotFound { entity: "User".into(), id: hospital_id.into() })?;
        let removed = self.users.remove(index);
        if let Err(e) = self.persist_users() {
            self.users.insert(index, removed);
            return Err(e);
        }
        Ok(())
    }

    pub fn update_user_password(&mut self, hospital_id: &str, password_hash: &str) -> Result<(), StoreError> {
        let index = self
            .users
            .iter()
            .position(|u| u.hospital_id == hospital_id)
            .ok_or_else(|| StoreError::NotFound { entity: "User".into(), id: hospital_id.into() })?;
        let previous = std::mem::replace(&mut self.users[index].password_hash, password_hash.into());
        if let Err(e) = self.persist_users() {
            self.users[index].password_hash = previous;
            return Err(e);
        }
        Ok(())
    }

    // ─── Appointments ─────────────────────────────────────────────────────────

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn appointment(&self, id: u32) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    /// Next id: 1 + the maximum ever stored. Cancelled appointments stay in
    /// the collection, so ids never repeat within a store's lifetime.
    pub fn next_appointment_id(&self) -> u32 {
        self.appointments.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }

    pub fn add_appointment(&mut self, appointment: Appointment) -> Result<(), StoreError> {
        if self.appointment(appointment.id).is_some() {
            return Err(StoreError::Duplicate {
                entity: "Appointment".into(),
                id: appointment.id.to_string(),
            });
        }
        self.appointments.push(appointment);
        if let Err(e) = self.persist_appointments() {
            self.appointments.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Replaces the appointment with the same id, in place.
    pub fn update_appointment(&mut self, updated: Appointment) -> Result<(), StoreError> {
        let index = self
            .appointments
            .iter()
            .position(|a| a.id == updated.id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Appointment".into(),
                id: updated.id.to_string(),
            })?;
        let previous = std::mem::replace(&mut self.appointments[index], updated);
        if let Err(e) = self.persist_appointments() {
            self.appointments[index] = previous;
            return Err(e);
        }
        Ok(())
    }

    // ─── Medical records ──────────────────────────────────────────────────────

    pub fn medical_records(&self) -> &[MedicalRecord] {
        &self.records
    }

    pub fn medical_record(&self, patient_id: &str) -> Option<&MedicalRecord> {
        self.records.iter().find(|r| r.patient_id == patient_id)
    }

    pub fn add_medical_record(&mut self, record: MedicalRecord) -> Result<(), StoreError> {
        if self.medical_record(&record.patient_id).is_some() {
            return Err(StoreError::Duplicate {
                entity: "MedicalRecord".into(),
                id: record.patient_id,
            });
        }
        if self.patient(&record.patient_id).is_none() {
            return Err(StoreError::ConstraintViolation(format!(
                "medical record requires an existing patient: {}",
                record.patient_id
            )));
        }
        self.records.push(record);
        if let Err(e) = self.persist_medical_records() {
            self.records.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Applies a mutation to one medical record and persists the collection,
    /// rolling the record back if the write fails.
    pub fn update_medical_record<F>(&mut self, patient_id: &str, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut MedicalRecord),
    {
        let index = self
            .records
            .iter()
            .position(|r| r.patient_id == patient_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "MedicalRecord".into(),
                id: patient_id.into(),
            })?;
        let previous = self.records[index].clone();
        mutate(&mut self.records[index]);
        if let Err(e) = self.persist_medical_records() {
            self.records[index] = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn add_diagnosis(&mut self, patient_id: &str, diagnosis: Diagnosis) -> Result<(), StoreError> {
        self.update_medical_record(patient_id, |r| r.add_diagnosis(diagnosis))
    }

    pub fn add_treatment(&mut self, patient_id: &str, treatment: Treatment) -> Result<(), StoreError> {
        self.update_medical_record(patient_id, |r| r.add_treatment(treatment))
    }

    pub fn add_prescription(
        &mut self,
        patient_id: &str,
        date: NaiveDate,
        prescription: Prescription,
    ) -> Result<(), StoreError> {
        self.update_medical_record(patient_id, |r| r.add_prescription(date, prescription))
    }

    /// Pharmacist operation: marks the first pending prescription for the
    /// given medication as dispensed.
    pub fn dispense_prescription(&mut self, patient_id: &str, medication: &str) -> Result<(), StoreError> {
        let record = self.medical_record(patient_id).ok_or_else(|| StoreError::NotFound {
            entity: "MedicalRecord".into(),
            id: patient_id.into(),
        })?;
        let found = record.treatments.iter().any(|t| {
            t.prescriptions
                .iter()
                .any(|p| p.medication == medication && p.status == PrescriptionStatus::Pending)
        });
        if !found {
            return Err(StoreError::NotFound {
                entity: "Prescription".into(),
                id: medication.into(),
            });
        }
        self.update_medical_record(patient_id, |r| {
            for treatment in &mut r.treatments {
                for p in &mut treatment.prescriptions {
                    if p.medication == medication && p.status == PrescriptionStatus::Pending {
                        p.status = PrescriptionStatus::Dispensed;
                        return;
                    }
                }
            }
        })
    }

    // ─── Schedules ────────────────────────────────────────────────────────────

    pub fn schedules(&self) -> &[DoctorSchedule] {
        &self.schedules
    }

    pub fn schedule(&self, doctor_id: &str) -> Option<&DoctorSchedule> {
        self.schedules.iter().find(|s| s.doctor_id == doctor_id)
    }

    /// Declared availability for a doctor on a date; empty when nothing was
    /// declared (callers distinguish that from "fully booked" via this call).
    pub fn declared_slots(&self, doctor_id: &str, date: NaiveDate) -> &[TimeSlot] {
        self.schedule(doctor_id).map(|s| s.slots_on(date)).unwrap_or(&[])
    }

    fn schedule_entry_mut(&mut self, doctor_id: &str) -> &mut DoctorSchedule {
        if let Some(index) = self.schedules.iter().position(|s| s.doctor_id == doctor_id) {
            return &mut self.schedules[index];
        }
        self.schedules.push(DoctorSchedule::new(doctor_id));
        let last = self.schedules.len() - 1;
        &mut self.schedules[last]
    }

    /// Replaces a doctor's declared slots for one date. Role and overlap
    /// validation happens in `availability::declare_availability`; this is the
    /// raw persistence step.
    pub fn set_availability(
        &mut self,
        doctor_id: &str,
        date: NaiveDate,
        slots: Vec<TimeSlot>,
    ) -> Result<(), StoreError> {
        let created = self.schedule(doctor_id).is_none();
        let entry = self.schedule_entry_mut(doctor_id);
        let previous = entry.days.insert(date, slots);
        if let Err(e) = self.persist_schedules() {
            // Exact rollback: a schedule entry created by this call goes too.
            if created {
                self.schedules.retain(|s| s.doctor_id != doctor_id);
            } else {
                let entry = self.schedule_entry_mut(doctor_id);
                match previous {
                    Some(prev) => {
                        entry.days.insert(date, prev);
                    }
                    None => {
                        entry.days.remove(&date);
                    }
                }
            }
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, ContactInfo, Role};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user(id: &str, role: Role) -> User {
        User {
            hospital_id: id.into(),
            password_hash: "x".into(),
            name: format!("User {id}"),
            date_of_birth: date(1985, 1, 1),
            gender: "F".into(),
            contact: ContactInfo { phone: "555".into(), email: format!("{id}@hospital.test") },
            role,
        }
    }

    fn slot(day: NaiveDate, h1: u32, h2: u32) -> TimeSlot {
        TimeSlot::new(day.and_hms_opt(h1, 0, 0).unwrap(), day.and_hms_opt(h2, 0, 0).unwrap())
    }

    fn appointment(id: u32, day: NaiveDate) -> Appointment {
        Appointment {
            id,
            patient_id: "P001".into(),
            doctor_id: "D001".into(),
            slot: slot(day, 9, 10),
            status: AppointmentStatus::Scheduled,
            outcome: String::new(),
        }
    }

    #[test]
    fn duplicate_hospital_id_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::open(tmp.path()).unwrap();
        store.add_user(user("D001", Role::Doctor)).unwrap();
        let err = store.add_user(user("D001", Role::Patient)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.users().len(), 1);
    }

    #[test]
    fn medical_record_requires_existing_patient() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::open(tmp.path()).unwrap();
        let record = MedicalRecord {
            patient_id: "P404".into(),
            name: "Ghost".into(),
            date_of_birth: date(1990, 1, 1),
            gender: "M".into(),
            contact: ContactInfo { phone: "555".into(), email: "g@x".into() },
            blood_type: "A+".into(),
            diagnoses: Vec::new(),
            treatments: Vec::new(),
            assigned_doctor_id: None,
        };
        let err = store.add_medical_record(record).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[test]
    fn appointment_ids_are_monotonic() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::open(tmp.path()).unwrap();
        assert_eq!(store.next_appointment_id(), 1);
        store.add_appointment(appointment(1, date(2030, 6, 1))).unwrap();
        store.add_appointment(appointment(2, date(2030, 6, 2))).unwrap();
        assert_eq!(store.next_appointment_id(), 3);

        // Cancellation keeps the record, so the id is never reissued.
        let mut cancelled = store.appointment(2).unwrap().clone();
        cancelled.status = AppointmentStatus::Cancelled;
        store.update_appointment(cancelled).unwrap();
        assert_eq!(store.next_appointment_id(), 3);
    }

    #[test]
    fn store_reloads_identically_after_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let day = date(2030, 6, 1);
        {
            let mut store = Store::open(tmp.path()).unwrap();
            store.add_user(user("D001", Role::Doctor)).unwrap();
            store.add_user(user("P001", Role::Patient)).unwrap();
            store.add_appointment(appointment(1, day)).unwrap();
            store.set_availability("D001", day, vec![slot(day, 9, 10), slot(day, 10, 11)]).unwrap();
            let mut record = MedicalRecord {
                patient_id: "P001".into(),
                name: "User P001".into(),
                date_of_birth: date(1985, 1, 1),
                gender: "F".into(),
                contact: ContactInfo { phone: "555".into(), email: "P001@hospital.test".into() },
                blood_type: "B+".into(),
                diagnoses: Vec::new(),
                treatments: Vec::new(),
                assigned_doctor_id: None,
            };
            record.add_diagnosis(Diagnosis { description: "Asthma".into(), date: day });
            store.add_medical_record(record).unwrap();
        }

        let reloaded = Store::open(tmp.path()).unwrap();
        assert_eq!(reloaded.users().len(), 2);
        assert_eq!(reloaded.appointments().len(), 1);
        assert_eq!(reloaded.medical_records().len(), 1);
        assert_eq!(reloaded.declared_slots("D001", day).len(), 2);
        assert_eq!(reloaded.medical_record("P001").unwrap().diagnoses.len(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped_on_load() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut store = Store::open(tmp.path()).unwrap();
            store.add_user(user("D001", Role::Doctor)).unwrap();
        }
        // Corrupt the users file with a truncated line between two good ones.
        let path = tmp.path().join(USERS_FILE);
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("garbage|line\n");
        content.push_str(&crate::db::codec::encode_user(&user("P001", Role::Patient)));
        content.push('\n');
        std::fs::write(&path, content).unwrap();

        let store = Store::open(tmp.path()).unwrap();
        assert_eq!(store.users().len(), 2);
        assert!(store.user("D001").is_some());
        assert!(store.user("P001").is_some());
    }

    #[test]
    fn schedule_for_unknown_doctor_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(SCHEDULES_FILE), "D999|2030-06-01|09:00-09:30\n").unwrap();
        let store = Store::open(tmp.path()).unwrap();
        assert!(store.schedules().is_empty());
    }

    #[test]
    fn failed_write_rolls_back_added_user() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::open(tmp.path()).unwrap();
        // A directory squatting on the file path makes the rename fail.
        std::fs::create_dir(tmp.path().join(USERS_FILE)).unwrap();

        let err = store.add_user(user("D001", Role::Doctor)).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.users().is_empty());

        // Once the path is writable again the same call goes through.
        std::fs::remove_dir(tmp.path().join(USERS_FILE)).unwrap();
        store.add_user(user("D001", Role::Doctor)).unwrap();
        assert_eq!(store.users().len(), 1);
    }

    #[test]
    fn failed_write_keeps_previous_appointment() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::open(tmp.path()).unwrap();
        let day = date(2030, 6, 1);
        store.add_appointment(appointment(1, day)).unwrap();

        std::fs::remove_file(tmp.path().join(APPOINTMENTS_FILE)).unwrap();
        std::fs::create_dir(tmp.path().join(APPOINTMENTS_FILE)).unwrap();

        let mut cancelled = store.appointment(1).unwrap().clone();
        cancelled.status = AppointmentStatus::Cancelled;
        let err = store.update_appointment(cancelled).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.appointment(1).unwrap().status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn failed_schedule_write_discards_created_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::open(tmp.path()).unwrap();
        store.add_user(user("D001", Role::Doctor)).unwrap();
        std::fs::create_dir(tmp.path().join(SCHEDULES_FILE)).unwrap();

        let day = date(2030, 6, 1);
        let err = store.set_availability("D001", day, vec![slot(day, 9, 10)]).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        // The entry created by the failed call is gone, not left empty.
        assert!(store.schedule("D001").is_none());
        assert!(store.schedules().is_empty());

        std::fs::remove_dir(tmp.path().join(SCHEDULES_FILE)).unwrap();
        store.set_availability("D001", day, vec![slot(day, 9, 10)]).unwrap();
        assert_eq!(store.declared_slots("D001", day).len(), 1);
    }

    #[test]
    fn dispense_marks_only_first_pending() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::open(tmp.path()).unwrap();
        store.add_user(user("P001", Role::Patient)).unwrap();
        store
            .add_medical_record(MedicalRecord {
                patient_id: "P001".into(),
                name: "User P001".into(),
                date_of_birth: date(1985, 1, 1),
                gender: "F".into(),
                contact: ContactInfo { phone: "555".into(), email: "p@x".into() },
                blood_type: "O-".into(),
                diagnoses: Vec::new(),
                treatments: Vec::new(),
                assigned_doctor_id: None,
            })
            .unwrap();
        let day = date(2030, 6, 1);
        for _ in 0..2 {
            store
                .add_prescription("P001", day, Prescription {
                    medication: "Ibuprofen".into(),
                    dosage: "200mg".into(),
                    status: PrescriptionStatus::Pending,
                })
                .unwrap();
        }

        store.dispense_prescription("P001", "Ibuprofen").unwrap();
        let record = store.medical_record("P001").unwrap();
        let statuses: Vec<_> = record.treatments[0].prescriptions.iter().map(|p| p.status).collect();
        assert_eq!(statuses, vec![PrescriptionStatus::Dispensed, PrescriptionStatus::Pending]);

        store.dispense_prescription("P001", "Ibuprofen").unwrap();
        let err = store.dispense_prescription("P001", "Ibuprofen").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
