//! Record codec: one entity per delimited text line, pure and I/O-free.
//!
//! Fields are joined by `|`, which is reserved and must not appear in field
//! content. Nested lists use their own separator layers so they can never
//! collide with the record separator. Absent nested data is written as the
//! literal `NULL` sentinel to keep "no data" distinguishable from an empty
//! string. Formats are append-only: new fields go at the end so older readers
//! keep working.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::models::{
    Appointment, AppointmentStatus, ContactInfo, Diagnosis, MedicalRecord, Prescription,
    PrescriptionStatus, Role, TimeSlot, Treatment, User,
};

pub const SEPARATOR: &str = "|";
pub const NULL_TOKEN: &str = "NULL";

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";
const DATETIME_FMT: &str = "%Y-%m-%dT%H:%M";
/// Width of one `%Y-%m-%dT%H:%M` timestamp, e.g. `2024-06-01T09:00`.
const DATETIME_WIDTH: usize = 16;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed {entity} record: expected at least {min} fields, got {got}")]
    MalformedRecord { entity: &'static str, min: usize, got: usize },

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: String, value: String },
}

fn invalid(field: &str, value: &str) -> DecodeError {
    DecodeError::InvalidField { field: field.into(), value: value.into() }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, DecodeError> {
    NaiveDate::parse_from_str(value, DATE_FMT).map_err(|_| invalid(field, value))
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, DecodeError> {
    NaiveTime::parse_from_str(value, TIME_FMT).map_err(|_| invalid(field, value))
}

fn parse_datetime(field: &str, value: &str) -> Result<NaiveDateTime, DecodeError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FMT).map_err(|_| invalid(field, value))
}

fn split_fields<'a>(
    entity: &'static str,
    line: &'a str,
    min: usize,
) -> Result<Vec<&'a str>, DecodeError> {
    let fields: Vec<&str> = line.split(SEPARATOR).collect();
    if fields.len() < min {
        return Err(DecodeError::MalformedRecord { entity, min, got: fields.len() });
    }
    Ok(fields)
}

// ─── Users ────────────────────────────────────────────────────────────────────

pub fn encode_user(user: &User) -> String {
    [
        user.hospital_id.as_str(),
        user.password_hash.as_str(),
        user.name.as_str(),
        &user.date_of_birth.format(DATE_FMT).to_string(),
        user.gender.as_str(),
        user.contact.phone.as_str(),
        user.contact.email.as_str(),
        user.role.as_str(),
    ]
    .join(SEPARATOR)
}

pub fn decode_user(line: &str) -> Result<User, DecodeError> {
    let fields = split_fields("user", line, 8)?;
    Ok(User {
        hospital_id: fields[0].to_string(),
        password_hash: fields[1].to_string(),
        name: fields[2].to_string(),
        date_of_birth: parse_date("dateOfBirth", fields[3])?,
        gender: fields[4].to_string(),
        contact: ContactInfo { phone: fields[5].to_string(), email: fields[6].to_string() },
        role: Role::from_str(fields[7])?,
    })
}

// ─── Appointments ─────────────────────────────────────────────────────────────

fn encode_slot(slot: &TimeSlot) -> String {
    format!("{}-{}", slot.start.format(DATETIME_FMT), slot.end.format(DATETIME_FMT))
}

/// Parses `START-END` where each side is a fixed-width `%Y-%m-%dT%H:%M`
/// timestamp. The split is positional because the date itself contains dashes.
fn decode_slot(value: &str) -> Result<TimeSlot, DecodeError> {
    let expected = DATETIME_WIDTH * 2 + 1;
    if value.len() != expected || value.as_bytes()[DATETIME_WIDTH] != b'-' {
        return Err(invalid("timeSlot", value));
    }
    let start = parse_datetime("timeSlot.start", &value[..DATETIME_WIDTH])?;
    let end = parse_datetime("timeSlot.end", &value[DATETIME_WIDTH + 1..])?;
    if start >= end {
        return Err(invalid("timeSlot", value));
    }
    Ok(TimeSlot::new(start, end))
}

pub fn encode_appointment(appt: &Appointment) -> String {
    [
        appt.id.to_string(),
        appt.patient_id.clone(),
        appt.doctor_id.clone(),
        encode_slot(&appt.slot),
        appt.status.as_str().to_string(),
        appt.outcome.clone(),
    ]
    .join(SEPARATOR)
}

pub fn decode_appointment(line: &str) -> Result<Appointment, DecodeError> {
    let fields = split_fields("appointment", line, 6)?;
    Ok(Appointment {
        id: fields[0].parse().map_err(|_| invalid("id", fields[0]))?,
        patient_id: fields[1].to_string(),
        doctor_id: fields[2].to_string(),
        slot: decode_slot(fields[3])?,
        status: AppointmentStatus::from_str(fields[4])?,
        outcome: fields[5].to_string(),
    })
}

// ─── Schedules ────────────────────────────────────────────────────────────────

/// One schedules.txt line covers one doctor on one date:
/// `doctorId|date|HH:MM-HH:MM,HH:MM-HH:MM,...` (slot list may be empty).
pub fn encode_schedule_entry(doctor_id: &str, date: NaiveDate, slots: &[TimeSlot]) -> String {
    let windows: Vec<String> = slots
        .iter()
        .map(|s| format!("{}-{}", s.start.format(TIME_FMT), s.end.format(TIME_FMT)))
        .collect();
    let date = date.format(DATE_FMT).to_string();
    [doctor_id, date.as_str(), windows.join(",").as_str()].join(SEPARATOR)
}

pub fn decode_schedule_entry(line: &str) -> Result<(String, NaiveDate, Vec<TimeSlot>), DecodeError> {
    let fields = split_fields("schedule", line, 3)?;
    let doctor_id = fields[0].to_string();
    let date = parse_date("date", fields[1])?;

    let mut slots = Vec::new();
    if !fields[2].is_empty() {
        for window in fields[2].split(',') {
            let (start, end) = window.split_once('-').ok_or_else(|| invalid("window", window))?;
            let start = date.and_time(parse_time("window.start", start)?);
            let end = date.and_time(parse_time("window.end", end)?);
            if start >= end {
                return Err(invalid("window", window));
            }
            slots.push(TimeSlot::new(start, end));
        }
    }
    Ok((doctor_id, date, slots))
}

// ─── Medical records ──────────────────────────────────────────────────────────

// Nested layers inside one medical-record field:
//   diagnoses    entry `description;date`, entries joined by `,`
//   treatments   entry `date;description;prescriptions`, entries joined by `^`
//   prescription `medication~dosage~status`, joined by `:` within a treatment

fn encode_diagnoses(diagnoses: &[Diagnosis]) -> String {
    if diagnoses.is_empty() {
        return NULL_TOKEN.to_string();
    }
    diagnoses
        .iter()
        .map(|d| format!("{};{}", d.description, d.date.format(DATE_FMT)))
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_diagnoses(value: &str) -> Result<Vec<Diagnosis>, DecodeError> {
    if value == NULL_TOKEN {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|entry| {
            let (description, date) =
                entry.split_once(';').ok_or_else(|| invalid("diagnosis", entry))?;
            Ok(Diagnosis {
                description: description.to_string(),
                date: parse_date("diagnosis.date", date)?,
            })
        })
        .collect()
}

fn encode_prescription(p: &Prescription) -> String {
    format!("{}~{}~{}", p.medication, p.dosage, p.status.as_str())
}

fn decode_prescription(value: &str) -> Result<Prescription, DecodeError> {
    let parts: Vec<&str> = value.split('~').collect();
    if parts.len() != 3 {
        return Err(invalid("prescription", value));
    }
    Ok(Prescription {
        medication: parts[0].to_string(),
        dosage: parts[1].to_string(),
        status: PrescriptionStatus::from_str(parts[2])?,
    })
}

fn encode_treatments(treatments: &[Treatment]) -> String {
    if treatments.is_empty() {
        return NULL_TOKEN.to_string();
    }
    treatments
        .iter()
        .map(|t| {
            let prescriptions: Vec<String> =
                t.prescriptions.iter().map(encode_prescription).collect();
            format!("{};{};{}", t.date.format(DATE_FMT), t.description, prescriptions.join(":"))
        })
        .collect::<Vec<_>>()
        .join("^")
}

fn decode_treatments(value: &str) -> Result<Vec<Treatment>, DecodeError> {
    if value == NULL_TOKEN {
        return Ok(Vec::new());
    }
    value
        .split('^')
        .map(|entry| {
            let parts: Vec<&str> = entry.splitn(3, ';').collect();
            if parts.len() != 3 {
                return Err(invalid("treatment", entry));
            }
            let prescriptions = if parts[2].is_empty() {
                Vec::new()
            } else {
                parts[2].split(':').map(decode_prescription).collect::<Result<_, _>>()?
            };
            Ok(Treatment {
                date: parse_date("treatment.date", parts[0])?,
                description: parts[1].to_string(),
                prescriptions,
            })
        })
        .collect()
}

pub fn encode_medical_record(record: &MedicalRecord) -> String {
    [
        record.patient_id.clone(),
        record.name.clone(),
        record.date_of_birth.format(DATE_FMT).to_string(),
        record.gender.clone(),
        record.contact.phone.clone(),
        record.contact.email.clone(),
        record.blood_type.clone(),
        encode_diagnoses(&record.diagnoses),
        encode_treatments(&record.treatments),
        record.assigned_doctor_id.clone().unwrap_or_else(|| NULL_TOKEN.to_string()),
    ]
    .join(SEPARATOR)
}

pub fn decode_medical_record(line: &str) -> Result<MedicalRecord, DecodeError> {
    let fields = split_fields("medical record", line, 10)?;
    Ok(MedicalRecord {
        patient_id: fields[0].to_string(),
        name: fields[1].to_string(),
        date_of_birth: parse_date("dateOfBirth", fields[2])?,
        gender: fields[3].to_string(),
        contact: ContactInfo { phone: fields[4].to_string(), email: fields[5].to_string() },
        blood_type: fields[6].to_string(),
        diagnoses: decode_diagnoses(fields[7])?,
        treatments: decode_treatments(fields[8])?,
        assigned_doctor_id: match fields[9] {
            NULL_TOKEN => None,
            other => Some(other.to_string()),
        },
    })
}
