//! Employee (caregiver) models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(Weekday::Monday),
            "tuesday" => Ok(Weekday::Tuesday),
            "wednesday" => Ok(Weekday::Wednesday),
            "thursday" => Ok(Weekday::Thursday),
            "friday" => Ok(Weekday::Friday),
            "saturday" => Ok(Weekday::Saturday),
            "sunday" => Ok(Weekday::Sunday),
            other => Err(format!("unknown weekday: {}", other)),
        }
    }
}

/// Capability flags checked when planning visits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Qualifications {
    pub nursing_degree: bool,
    pub wound_care: bool,
    pub medication_administration: bool,
    pub palliative_care: bool,
    pub dementia_care: bool,
    pub intensive_care: bool,
}

/// Working window for one weekday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WorkingDay {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub is_working_day: bool,
}

/// An employee of the nursing service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Job title, e.g. "nurse", "care assistant"
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Qualifications,
    pub working_hours: BTreeMap<Weekday, WorkingDay>,
    pub max_patients_per_day: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// Default daily patient capacity.
pub const DEFAULT_MAX_PATIENTS_PER_DAY: u32 = 10;

impl Employee {
    pub fn new(first_name: String, last_name: String, role: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            first_name,
            last_name,
            role,
            email: None,
            phone: None,
            qualifications: Qualifications::default(),
            working_hours: BTreeMap::new(),
            max_patients_per_day: DEFAULT_MAX_PATIENTS_PER_DAY,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Working window for the given date, if it is a working day.
    pub fn working_day(&self, date: NaiveDate) -> Option<&WorkingDay> {
        self.working_hours
            .get(&Weekday::of(date))
            .filter(|day| day.is_working_day)
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Input for creating an employee.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub qualifications: Qualifications,
    #[serde(default)]
    pub working_hours: BTreeMap<Weekday, WorkingDay>,
    pub max_patients_per_day: Option<u32>,
}

impl NewEmployee {
    pub fn into_employee(self) -> Employee {
        let mut employee = Employee::new(self.first_name, self.last_name, self.role);
        employee.email = self.email;
        employee.phone = self.phone;
        employee.qualifications = self.qualifications;
        employee.working_hours = self.working_hours;
        if let Some(max) = self.max_patients_per_day {
            employee.max_patients_per_day = max;
        }
        employee
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Option<Qualifications>,
    pub working_hours: Option<BTreeMap<Weekday, WorkingDay>>,
    pub max_patients_per_day: Option<u32>,
}

impl EmployeePatch {
    pub fn apply(self, employee: &mut Employee) {
        if let Some(v) = self.first_name {
            employee.first_name = v;
        }
        if let Some(v) = self.last_name {
            employee.last_name = v;
        }
        if let Some(v) = self.role {
            employee.role = v;
        }
        if let Some(v) = self.email {
            employee.email = Some(v);
        }
        if let Some(v) = self.phone {
            employee.phone = Some(v);
        }
        if let Some(v) = self.qualifications {
            employee.qualifications = v;
        }
        if let Some(v) = self.working_hours {
            employee.working_hours = v;
        }
        if let Some(v) = self.max_patients_per_day {
            employee.max_patients_per_day = v;
        }
        employee.touch();
    }
}
