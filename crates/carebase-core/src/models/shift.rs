//! Shift roster models.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Kind of shift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShiftType {
    Regular,
    OnCall,
    Overtime,
}

impl ShiftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftType::Regular => "regular",
            ShiftType::OnCall => "on_call",
            ShiftType::Overtime => "overtime",
        }
    }
}

impl FromStr for ShiftType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(ShiftType::Regular),
            "on_call" => Ok(ShiftType::OnCall),
            "overtime" => Ok(ShiftType::Overtime),
            other => Err(format!("unknown shift type: {}", other)),
        }
    }
}

/// What kind of conflict was detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Overlap,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

/// Advisory conflict attached to a shift. Conflicts never block saving.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictInfo {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub description: String,
    pub severity: ConflictSeverity,
    pub conflicting_shift_ids: Vec<String>,
}

/// A scheduled work interval of an employee, `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shift {
    pub id: String,
    pub employee_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub shift_type: ShiftType,
    pub notes: Option<String>,
    pub conflict_info: Option<ConflictInfo>,
    pub created_at: String,
    pub updated_at: String,
}

impl Shift {
    pub fn new(
        employee_id: String,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        shift_type: ShiftType,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id,
            start_time,
            end_time,
            shift_type,
            notes: None,
            conflict_info: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Calendar day the shift starts on.
    pub fn day(&self) -> NaiveDate {
        self.start_time.date()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Input for creating a shift.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShift {
    pub employee_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(default = "default_shift_type")]
    pub shift_type: ShiftType,
    pub notes: Option<String>,
}

fn default_shift_type() -> ShiftType {
    ShiftType::Regular
}

impl NewShift {
    pub fn into_shift(self) -> Shift {
        let mut shift = Shift::new(self.employee_id, self.start_time, self.end_time, self.shift_type);
        shift.notes = self.notes;
        shift
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftPatch {
    pub employee_id: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub shift_type: Option<ShiftType>,
    pub notes: Option<String>,
}

impl ShiftPatch {
    pub fn apply(self, shift: &mut Shift) {
        if let Some(v) = self.employee_id {
            shift.employee_id = v;
        }
        if let Some(v) = self.start_time {
            shift.start_time = v;
        }
        if let Some(v) = self.end_time {
            shift.end_time = v;
        }
        if let Some(v) = self.shift_type {
            shift.shift_type = v;
        }
        if let Some(v) = self.notes {
            shift.notes = Some(v);
        }
        shift.touch();
    }
}

/// Filter for listing shifts. `from`/`to` select shifts intersecting the window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftFilter {
    pub employee_id: Option<String>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

/// Dry-run conflict check for a prospective shift.
#[derive(Debug, Clone, Deserialize)]
pub struct ConflictQuery {
    pub employee_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Stored shift being edited, excluded from the check
    pub shift_id: Option<String>,
}

/// Outcome of a dry-run conflict check.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub conflicts: Vec<Shift>,
    pub conflict_info: Option<ConflictInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_type_serde() {
        assert_eq!(
            serde_json::to_string(&ShiftType::OnCall).unwrap(),
            "\"on_call\""
        );
        assert_eq!("overtime".parse::<ShiftType>().unwrap(), ShiftType::Overtime);
    }

    #[test]
    fn test_conflict_info_wire_format() {
        let info = ConflictInfo {
            kind: ConflictKind::Overlap,
            description: "overlaps".into(),
            severity: ConflictSeverity::High,
            conflicting_shift_ids: vec!["s1".into()],
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "overlap");
        assert_eq!(json["severity"], "high");
    }

    #[test]
    fn test_new_shift_defaults_to_regular() {
        let input: NewShift = serde_json::from_value(serde_json::json!({
            "employee_id": "emp-1",
            "start_time": "2024-05-06T06:00:00",
            "end_time": "2024-05-06T14:00:00"
        }))
        .unwrap();
        let shift = input.into_shift();
        assert_eq!(shift.shift_type, ShiftType::Regular);
        assert_eq!(shift.duration_minutes(), 480);
    }
}
