//! Hygienist master data.

use serde::{Deserialize, Serialize};

/// A dental hygienist on staff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hygienist {
    /// Store-assigned identifier
    pub id: i64,
    /// External staff code (unique)
    pub staff_code: String,
    /// Full name
    pub name: String,
    /// National license number
    pub license_number: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// Fields required to register a hygienist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HygienistInput {
    pub staff_code: String,
    pub name: String,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl HygienistInput {
    pub fn new(staff_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            staff_code: staff_code.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update for a hygienist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HygienistPatch {
    pub staff_code: Option<String>,
    pub name: Option<String>,
    pub license_number: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
}

impl Hygienist {
    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &HygienistPatch) {
        if let Some(code) = &patch.staff_code {
            self.staff_code = code.clone();
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(license) = &patch.license_number {
            self.license_number = license.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = phone.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.staff_code)
    }
}
