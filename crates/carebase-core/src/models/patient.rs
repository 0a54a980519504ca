//! Patient models.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::routing::Coordinates;

/// Care level 1-5. Drives visit duration and billing codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CareLevel(u8);

impl CareLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create a care level, `None` outside 1-5.
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CareLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "care level must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )
        })
    }
}

impl From<CareLevel> for u8 {
    fn from(level: CareLevel) -> Self {
        level.0
    }
}

impl fmt::Display for CareLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Insurance identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Insurance {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub number: String,
}

/// Emergency contact person.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relation: Option<String>,
}

/// A home-care patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub care_level: CareLevel,
    /// Human-readable street address
    pub address: String,
    /// Geocoded location used for routing
    pub location: Option<Coordinates>,
    pub phone: Option<String>,
    pub medications: Vec<String>,
    pub insurance: Insurance,
    pub emergency_contact: Option<EmergencyContact>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(first_name: String, last_name: String, care_level: CareLevel) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            first_name,
            last_name,
            birth_date: None,
            care_level,
            address: String::new(),
            location: None,
            phone: None,
            medications: Vec::new(),
            insurance: Insurance::default(),
            emergency_contact: None,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Location for routing, falling back to the default point.
    pub fn coordinates(&self) -> Coordinates {
        self.location.unwrap_or(Coordinates::FALLBACK)
    }

    /// Fill `location` from a legacy `"lat,lng"` address when it is missing.
    pub fn resolve_legacy_location(&mut self) {
        if self.location.is_none() {
            self.location = Coordinates::parse_pair(&self.address);
        }
    }

    /// Age in whole years on the given day.
    pub fn age_on(&self, day: NaiveDate) -> Option<u32> {
        self.birth_date.and_then(|birth| day.years_since(birth))
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Input for creating a patient.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub care_level: CareLevel,
    #[serde(default)]
    pub address: String,
    pub location: Option<Coordinates>,
    pub phone: Option<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub insurance: Insurance,
    pub emergency_contact: Option<EmergencyContact>,
    pub notes: Option<String>,
}

impl NewPatient {
    pub fn into_patient(self) -> Patient {
        let mut patient = Patient::new(self.first_name, self.last_name, self.care_level);
        patient.birth_date = self.birth_date;
        patient.address = self.address;
        patient.location = self.location;
        patient.phone = self.phone;
        patient.medications = self.medications;
        patient.insurance = self.insurance;
        patient.emergency_contact = self.emergency_contact;
        patient.notes = self.notes;
        patient.resolve_legacy_location();
        patient
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub care_level: Option<CareLevel>,
    pub address: Option<String>,
    pub location: Option<Coordinates>,
    pub phone: Option<String>,
    pub medications: Option<Vec<String>>,
    pub insurance: Option<Insurance>,
    pub emergency_contact: Option<EmergencyContact>,
    pub notes: Option<String>,
}

impl PatientPatch {
    pub fn apply(self, patient: &mut Patient) {
        if let Some(v) = self.first_name {
            patient.first_name = v;
        }
        if let Some(v) = self.last_name {
            patient.last_name = v;
        }
        if let Some(v) = self.birth_date {
            patient.birth_date = Some(v);
        }
        if let Some(v) = self.care_level {
            patient.care_level = v;
        }
        if let Some(v) = self.address {
            patient.address = v;
            if self.location.is_none() {
                // A new address invalidates a location parsed from the old one.
                patient.location = None;
                patient.resolve_legacy_location();
            }
        }
        if let Some(v) = self.location {
            patient.location = Some(v);
        }
        if let Some(v) = self.phone {
            patient.phone = Some(v);
        }
        if let Some(v) = self.medications {
            patient.medications = v;
        }
        if let Some(v) = self.insurance {
            patient.insurance = v;
        }
        if let Some(v) = self.emergency_contact {
            patient.emergency_contact = Some(v);
        }
        if let Some(v) = self.notes {
            patient.notes = Some(v);
        }
        patient.touch();
    }
}
