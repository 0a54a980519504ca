//! Prompt builders for the care assistant.
//!
//! Each task gets a system prompt fixing the role and output format, and a
//! user prompt carrying the data. Tasks with structured output ask for a
//! single JSON object so [`crate::parse_json_response`] can read it.

use crate::assistant::{PatientSnapshot, ScheduleRequest, TourStopSnapshot};

/// A system/user prompt pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// Whether the answer must be a JSON object
    pub json: bool,
}

const ROLE: &str = "You are an assistant for a home-nursing service. Be factual and concise. \
Never invent medical facts that are not in the data you are given.";

fn system(task: &str) -> String {
    format!("{}\n\n{}", ROLE, task)
}

fn describe_patient(patient: &PatientSnapshot) -> String {
    let mut lines = vec![
        format!("Name: {}", patient.name),
        format!("Care level: {}", patient.care_level),
    ];
    if let Some(age) = patient.age {
        lines.push(format!("Age: {}", age));
    }
    if !patient.medications.is_empty() {
        lines.push(format!("Medications: {}", patient.medications.join(", ")));
    }
    if let Some(notes) = &patient.notes {
        lines.push(format!("Notes: {}", notes));
    }
    if !patient.recent_documentation.is_empty() {
        lines.push("Recent documentation:".into());
        lines.extend(patient.recent_documentation.iter().map(|d| format!("- {}", d)));
    }
    lines.join("\n")
}

pub fn patient_summary(patient: &PatientSnapshot) -> Prompt {
    Prompt {
        system: system("Summarize the patient for a caregiver about to visit. Plain text, at most five sentences."),
        user: describe_patient(patient),
        json: false,
    }
}

pub fn care_prediction(patient: &PatientSnapshot) -> Prompt {
    Prompt {
        system: system(
            r#"Predict the patient's upcoming care needs. Answer with one JSON object:
{"needs": [string], "suggested_care_level": 1-5 or null, "rationale": string}"#,
        ),
        user: describe_patient(patient),
        json: true,
    }
}

pub fn tour_order(stops: &[TourStopSnapshot]) -> Prompt {
    let listing = stops
        .iter()
        .map(|s| {
            format!(
                "- id={} name={} lat={:.5} lng={:.5} care_level={}",
                s.patient_id, s.name, s.lat, s.lng, s.care_level
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    Prompt {
        system: system(
            r#"Order the visits of one caregiver's tour to minimise travel. Keep the first visit first.
Use every id exactly once. Answer with one JSON object:
{"patient_ids": [string], "reasoning": string}"#,
        ),
        user: format!("Visits in current order:\n{}", listing),
        json: true,
    }
}

pub fn schedule(request: &ScheduleRequest) -> Prompt {
    let employees = request
        .employees
        .iter()
        .map(|e| {
            format!(
                "- id={} name={} preferred={} unavailable={} max_shifts_per_week={}",
                e.id,
                e.name,
                e.preferred_shift_types.join("/"),
                e.unavailable_weekdays.join("/"),
                e.max_shifts_per_week
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".into())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let shifts = request
        .existing_shifts
        .iter()
        .map(|s| format!("- {} {} - {}", s.employee_id, s.start_time, s.end_time))
        .collect::<Vec<_>>()
        .join("\n");
    Prompt {
        system: system(
            r#"Propose shifts for the period that respect preferences and never overlap existing shifts.
Answer with one JSON object:
{"suggestions": [{"employee_id": string, "start_time": "YYYY-MM-DDTHH:MM:SS", "end_time": "YYYY-MM-DDTHH:MM:SS", "reason": string}], "notes": string}"#,
        ),
        user: format!(
            "Period: {} to {}\nEmployees:\n{}\nExisting shifts:\n{}",
            request.from, request.to, employees, shifts
        ),
        json: true,
    }
}

pub fn billing_text(text: &str) -> Prompt {
    Prompt {
        system: system(
            "Rewrite the billing text so an insurance clerk can read it. Keep every service, date and amount. Plain text only.",
        ),
        user: text.to_string(),
        json: false,
    }
}

pub fn transcription_cleanup(text: &str) -> Prompt {
    Prompt {
        system: system(
            "Clean up a dictated care note: fix punctuation, casing and obvious recognition errors. Do not add content. Plain text only.",
        ),
        user: text.to_string(),
        json: false,
    }
}

pub fn patient_extraction() -> Prompt {
    Prompt {
        system: system(
            r#"Read the attached document and extract the patient's master data. Use null for anything not present.
Answer with one JSON object:
{"first_name", "last_name", "birth_date" (YYYY-MM-DD), "address", "phone", "insurance_provider", "insurance_number", "medications": [string]}"#,
        ),
        user: "Extract the patient data from this document.".into(),
        json: true,
    }
}
