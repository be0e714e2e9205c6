//! Patient master data.

use serde::{Deserialize, Serialize};

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Store-assigned identifier
    pub id: i64,
    /// External patient code (unique, e.g. chart number)
    pub patient_code: String,
    /// Full name
    pub name: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// Fields required to register a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientInput {
    pub patient_code: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl PatientInput {
    /// Create an input with the required fields.
    pub fn new(patient_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            patient_code: patient_code.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update for a patient. `None` leaves a field untouched,
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientPatch {
    pub patient_code: Option<String>,
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

impl Patient {
    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &PatientPatch) {
        if let Some(code) = &patch.patient_code {
            self.patient_code = code.clone();
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = phone.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(address) = &patch.address {
            self.address = address.clone();
        }
    }

    /// Label used in reports and exports.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.patient_code)
    }
}
