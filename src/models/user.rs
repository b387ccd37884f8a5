use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::Role;

/// Phone and email pair shared by users and medical records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: String,
    pub email: String,
}

/// A hospital account. The role is fixed at creation; role-specific behavior
/// (menus, password flows) lives outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub hospital_id: String,
    pub password_hash: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub contact: ContactInfo,
    pub role: Role,
}

impl User {
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }

    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }
}
