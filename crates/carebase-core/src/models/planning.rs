//! Shift planning aids: templates, employee preferences and change requests.

use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::employee::Weekday;
use super::shift::{Shift, ShiftType};

/// A reusable shift pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftTemplate {
    pub id: String,
    pub name: String,
    pub start: NaiveTime,
    /// An end at or before `start` means the shift runs past midnight
    pub end: NaiveTime,
    pub shift_type: ShiftType,
    pub weekdays: Vec<Weekday>,
    pub created_at: String,
    pub updated_at: String,
}

impl ShiftTemplate {
    /// Concrete interval of this template on a given day.
    pub fn interval_on(&self, day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = day.and_time(self.start);
        let mut end = day.and_time(self.end);
        if end <= start {
            end += Duration::days(1);
        }
        (start, end)
    }

    /// Shifts for every matching weekday in `[from, to]`.
    pub fn instantiate(&self, employee_id: &str, from: NaiveDate, to: NaiveDate) -> Vec<Shift> {
        from.iter_days()
            .take_while(|day| *day <= to)
            .filter(|day| self.weekdays.contains(&Weekday::of(*day)))
            .map(|day| {
                let (start, end) = self.interval_on(day);
                let mut shift = Shift::new(employee_id.to_string(), start, end, self.shift_type);
                shift.notes = Some(format!("from template {}", self.name));
                shift
            })
            .collect()
    }
}

/// Input for creating a shift template.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShiftTemplate {
    pub name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub shift_type: ShiftType,
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
}

impl NewShiftTemplate {
    pub fn into_template(self) -> ShiftTemplate {
        let now = chrono::Utc::now().to_rfc3339();
        ShiftTemplate {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            start: self.start,
            end: self.end,
            shift_type: self.shift_type,
            weekdays: self.weekdays,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Scheduling wishes of one employee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftPreference {
    pub employee_id: String,
    pub preferred_shift_types: Vec<ShiftType>,
    pub unavailable_weekdays: Vec<Weekday>,
    pub max_shifts_per_week: Option<u32>,
    pub notes: Option<String>,
    pub updated_at: String,
}

/// Body of a preference upsert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftPreferenceInput {
    #[serde(default)]
    pub preferred_shift_types: Vec<ShiftType>,
    #[serde(default)]
    pub unavailable_weekdays: Vec<Weekday>,
    pub max_shifts_per_week: Option<u32>,
    pub notes: Option<String>,
}

impl ShiftPreferenceInput {
    pub fn into_preference(self, employee_id: String) -> ShiftPreference {
        ShiftPreference {
            employee_id,
            preferred_shift_types: self.preferred_shift_types,
            unavailable_weekdays: self.unavailable_weekdays,
            max_shifts_per_week: self.max_shifts_per_week,
            notes: self.notes,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestKind {
    Swap,
    Cancel,
    TimeChange,
}

impl ChangeRequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestKind::Swap => "swap",
            ChangeRequestKind::Cancel => "cancel",
            ChangeRequestKind::TimeChange => "time_change",
        }
    }
}

impl FromStr for ChangeRequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swap" => Ok(ChangeRequestKind::Swap),
            "cancel" => Ok(ChangeRequestKind::Cancel),
            "time_change" => Ok(ChangeRequestKind::TimeChange),
            other => Err(format!("unknown change request kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl ChangeRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestStatus::Pending => "pending",
            ChangeRequestStatus::Approved => "approved",
            ChangeRequestStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ChangeRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChangeRequestStatus::Pending),
            "approved" => Ok(ChangeRequestStatus::Approved),
            "rejected" => Ok(ChangeRequestStatus::Rejected),
            other => Err(format!("unknown change request status: {}", other)),
        }
    }
}

/// A request to swap, cancel or move an existing shift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftChangeRequest {
    pub id: String,
    pub shift_id: String,
    pub requested_by: String,
    pub kind: ChangeRequestKind,
    pub reason: Option<String>,
    pub proposed_start: Option<NaiveDateTime>,
    pub proposed_end: Option<NaiveDateTime>,
    pub swap_with_employee_id: Option<String>,
    pub status: ChangeRequestStatus,
    pub decided_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for filing a change request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShiftChangeRequest {
    pub shift_id: String,
    pub requested_by: String,
    pub kind: ChangeRequestKind,
    pub reason: Option<String>,
    pub proposed_start: Option<NaiveDateTime>,
    pub proposed_end: Option<NaiveDateTime>,
    pub swap_with_employee_id: Option<String>,
}

impl NewShiftChangeRequest {
    /// Check that the fields the kind needs are present.
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            ChangeRequestKind::Swap if self.swap_with_employee_id.is_none() => {
                Err("swap requests need swap_with_employee_id".into())
            }
            ChangeRequestKind::TimeChange => match (self.proposed_start, self.proposed_end) {
                (Some(start), Some(end)) if start < end => Ok(()),
                (Some(_), Some(_)) => Err("proposed_end must be after proposed_start".into()),
                _ => Err("time_change requests need proposed_start and proposed_end".into()),
            },
            _ => Ok(()),
        }
    }

    pub fn into_request(self) -> ShiftChangeRequest {
        let now = chrono::Utc::now().to_rfc3339();
        ShiftChangeRequest {
            id: uuid::Uuid::new_v4().to_string(),
            shift_id: self.shift_id,
            requested_by: self.requested_by,
            kind: self.kind,
            reason: self.reason,
            proposed_start: self.proposed_start,
            proposed_end: self.proposed_end,
            swap_with_employee_id: self.swap_with_employee_id,
            status: ChangeRequestStatus::Pending,
            decided_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
