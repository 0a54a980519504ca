//! Structured data extraction from model output.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Assistant errors.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Assistant unavailable: {0}")]
    Unavailable(String),
}

pub type AssistantResult<T> = Result<T, AssistantError>;

/// Predicted care needs for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarePrediction {
    #[serde(default)]
    pub needs: Vec<String>,
    pub suggested_care_level: Option<u8>,
    #[serde(default)]
    pub rationale: String,
}

/// A proposed visiting order for a tour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TourOrderSuggestion {
    pub patient_ids: Vec<String>,
    pub reasoning: Option<String>,
}

/// One proposed shift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftSuggestion {
    pub employee_id: String,
    /// `YYYY-MM-DDTHH:MM:SS`
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSuggestion {
    #[serde(default)]
    pub suggestions: Vec<ShiftSuggestion>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Patient master data read from an uploaded document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractedPatient {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `YYYY-MM-DD`
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    pub medications: Vec<String>,
}

/// Slice from the first `{` to the last `}`, dropping any prose the model
/// put around the JSON.
pub fn json_object_slice(text: &str) -> AssistantResult<&str> {
    let start = text.find('{').ok_or_else(|| {
        AssistantError::InvalidFormat("No JSON object found in response".into())
    })?;
    let end = text.rfind('}').ok_or_else(|| {
        AssistantError::InvalidFormat("No closing brace found in response".into())
    })?;
    if end < start {
        return Err(AssistantError::InvalidFormat(
            "Closing brace before opening brace".into(),
        ));
    }
    Ok(&text[start..=end])
}

/// Parse the JSON object embedded in a model response.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> AssistantResult<T> {
    Ok(serde_json::from_str(json_object_slice(text)?)?)
}

/// Free-text answers: strip surrounding whitespace and a wrapping pair of
/// quotes. Empty output is an error.
pub fn clean_text_response(text: &str) -> AssistantResult<String> {
    let trimmed = text.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim();
    if unquoted.is_empty() {
        return Err(AssistantError::InvalidFormat("Empty response".into()));
    }
    Ok(unquoted.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_prediction() {
        let json = r#"{"needs":["wound care","mobility support"],"suggested_care_level":3,"rationale":"post-op"}"#;
        let prediction: CarePrediction = parse_json_response(json).unwrap();
        assert_eq!(prediction.needs.len(), 2);
        assert_eq!(prediction.suggested_care_level, Some(3));
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let text = r#"Sure, here is the order:
{"patient_ids":["p2","p1"],"reasoning":"shorter"}
Let me know if you need more."#;
        let suggestion: TourOrderSuggestion = parse_json_response(text).unwrap();
        assert_eq!(suggestion.patient_ids, vec!["p2", "p1"]);
    }

    #[test]
    fn test_no_json() {
        assert!(matches!(
            parse_json_response::<TourOrderSuggestion>("no idea"),
            Err(AssistantError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_json_response::<TourOrderSuggestion>("} oops {"),
            Err(AssistantError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_wrong_shape_is_json_error() {
        assert!(matches!(
            parse_json_response::<TourOrderSuggestion>(r#"{"order": 1}"#),
            Err(AssistantError::JsonParse(_))
        ));
    }

    #[test]
    fn test_extracted_patient_tolerates_missing_fields() {
        let patient: ExtractedPatient = parse_json_response(r#"{"last_name":"Brandt"}"#).unwrap();
        assert_eq!(patient.last_name.as_deref(), Some("Brandt"));
        assert!(patient.medications.is_empty());
    }

    #[test]
    fn test_clean_text_response() {
        assert_eq!(clean_text_response("  \"Hello.\"\n").unwrap(), "Hello.");
        assert_eq!(clean_text_response("plain").unwrap(), "plain");
        assert!(clean_text_response("  ").is_err());
    }

    proptest! {
        #[test]
        fn slice_is_braced_or_error(text in ".{0,64}") {
            if let Ok(slice) = json_object_slice(&text) {
                prop_assert!(slice.starts_with('{'), "slice must open with a brace: {:?}", slice);
                prop_assert!(slice.ends_with('}'), "slice must close with a brace: {:?}", slice);
            }
        }
    }
}
