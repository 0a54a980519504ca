//! The assistant seam and its providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extraction::{
    clean_text_response, parse_json_response, AssistantError, AssistantResult, CarePrediction,
    ExtractedPatient, ScheduleSuggestion, TourOrderSuggestion,
};
use crate::prompts::{self, Prompt};

// =========================================================================
// Inputs
// =========================================================================

/// What the assistant gets to see of a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSnapshot {
    pub name: String,
    pub age: Option<u32>,
    pub care_level: u8,
    pub medications: Vec<String>,
    pub notes: Option<String>,
    /// Newest first
    pub recent_documentation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TourStopSnapshot {
    pub patient_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub care_level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployeeSnapshot {
    pub id: String,
    pub name: String,
    pub preferred_shift_types: Vec<String>,
    pub unavailable_weekdays: Vec<String>,
    pub max_shifts_per_week: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftSnapshot {
    pub employee_id: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleRequest {
    /// `YYYY-MM-DD`
    pub from: String,
    pub to: String,
    pub employees: Vec<EmployeeSnapshot>,
    pub existing_shifts: Vec<ShiftSnapshot>,
}

/// An uploaded image, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageInput {
    pub mime_type: String,
    pub data_base64: String,
}

// =========================================================================
// Traits
// =========================================================================

/// Care tasks delegated to a generative model.
#[async_trait]
pub trait CareAssistant: Send + Sync {
    async fn summarize_patient(&self, patient: &PatientSnapshot) -> AssistantResult<String>;

    async fn predict_care_needs(&self, patient: &PatientSnapshot) -> AssistantResult<CarePrediction>;

    async fn suggest_tour_order(&self, stops: &[TourStopSnapshot]) -> AssistantResult<TourOrderSuggestion>;

    async fn suggest_schedule(&self, request: &ScheduleRequest) -> AssistantResult<ScheduleSuggestion>;

    async fn enhance_billing_text(&self, text: &str) -> AssistantResult<String>;

    async fn clean_transcription(&self, text: &str) -> AssistantResult<String>;

    async fn extract_patient_data(&self, image: &ImageInput) -> AssistantResult<ExtractedPatient>;
}

/// A raw text-completion backend.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &Prompt, image: Option<&ImageInput>) -> AssistantResult<String>;
}

// =========================================================================
// Model-backed assistant
// =========================================================================

/// [`CareAssistant`] on top of any [`Completion`] backend.
pub struct LlmAssistant<C> {
    backend: C,
}

impl<C: Completion> LlmAssistant<C> {
    pub fn new(backend: C) -> Self {
        Self { backend }
    }

    async fn text(&self, prompt: Prompt) -> AssistantResult<String> {
        let raw = self.backend.complete(&prompt, None).await?;
        clean_text_response(&raw)
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        prompt: Prompt,
        image: Option<&ImageInput>,
    ) -> AssistantResult<T> {
        let raw = self.backend.complete(&prompt, image).await?;
        debug!(bytes = raw.len(), "parsing model response");
        parse_json_response(&raw)
    }
}

#[async_trait]
impl<C: Completion> CareAssistant for LlmAssistant<C> {
    async fn summarize_patient(&self, patient: &PatientSnapshot) -> AssistantResult<String> {
        self.text(prompts::patient_summary(patient)).await
    }

    async fn predict_care_needs(&self, patient: &PatientSnapshot) -> AssistantResult<CarePrediction> {
        self.json(prompts::care_prediction(patient), None).await
    }

    async fn suggest_tour_order(&self, stops: &[TourStopSnapshot]) -> AssistantResult<TourOrderSuggestion> {
        self.json(prompts::tour_order(stops), None).await
    }

    async fn suggest_schedule(&self, request: &ScheduleRequest) -> AssistantResult<ScheduleSuggestion> {
        self.json(prompts::schedule(request), None).await
    }

    async fn enhance_billing_text(&self, text: &str) -> AssistantResult<String> {
        self.text(prompts::billing_text(text)).await
    }

    async fn clean_transcription(&self, text: &str) -> AssistantResult<String> {
        self.text(prompts::transcription_cleanup(text)).await
    }

    async fn extract_patient_data(&self, image: &ImageInput) -> AssistantResult<ExtractedPatient> {
        self.json(prompts::patient_extraction(), Some(image)).await
    }
}

// =========================================================================
// Disabled
// =========================================================================

/// Used when no provider is configured. Every call is `Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAssistant;

impl DisabledAssistant {
    fn unavailable<T>() -> AssistantResult<T> {
        Err(AssistantError::Unavailable("no AI provider configured".into()))
    }
}

#[async_trait]
impl CareAssistant for DisabledAssistant {
    async fn summarize_patient(&self, _: &PatientSnapshot) -> AssistantResult<String> {
        Self::unavailable()
    }

    async fn predict_care_needs(&self, _: &PatientSnapshot) -> AssistantResult<CarePrediction> {
        Self::unavailable()
    }

    async fn suggest_tour_order(&self, _: &[TourStopSnapshot]) -> AssistantResult<TourOrderSuggestion> {
        Self::unavailable()
    }

    async fn suggest_schedule(&self, _: &ScheduleRequest) -> AssistantResult<ScheduleSuggestion> {
        Self::unavailable()
    }

    async fn enhance_billing_text(&self, _: &str) -> AssistantResult<String> {
        Self::unavailable()
    }

    async fn clean_transcription(&self, _: &str) -> AssistantResult<String> {
        Self::unavailable()
    }

    async fn extract_patient_data(&self, _: &ImageInput) -> AssistantResult<ExtractedPatient> {
        Self::unavailable()
    }
}

// =========================================================================
// Mock
// =========================================================================

/// Deterministic assistant for tests and offline development.
///
/// Tours are ordered nearest-neighbour from the first stop unless a fixed
/// order was given with [`MockAssistant::with_tour_order`].
#[derive(Debug, Clone, Default)]
pub struct MockAssistant {
    tour_order: Option<Vec<String>>,
}

impl MockAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always suggest this order, whatever the tour holds.
    pub fn with_tour_order(order: Vec<String>) -> Self {
        Self {
            tour_order: Some(order),
        }
    }
}

/// Collapse whitespace, capitalise the first letter and end with a full stop.
fn tidy_sentence(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let mut out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return String::new(),
    };
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

fn nearest_neighbour(stops: &[TourStopSnapshot]) -> Vec<String> {
    let mut remaining: Vec<&TourStopSnapshot> = stops.iter().collect();
    if remaining.is_empty() {
        return Vec::new();
    }
    let mut current = remaining.remove(0);
    let mut order = vec![current.patient_id.clone()];
    while !remaining.is_empty() {
        let (idx, _) = remaining
            .iter()
            .enumerate()
            .map(|(i, s)| (i, (s.lat - current.lat).powi(2) + (s.lng - current.lng).powi(2)))
            .fold((0, f64::INFINITY), |best, cand| if cand.1 < best.1 { cand } else { best });
        current = remaining.remove(idx);
        order.push(current.patient_id.clone());
    }
    order
}

#[async_trait]
impl CareAssistant for MockAssistant {
    async fn summarize_patient(&self, patient: &PatientSnapshot) -> AssistantResult<String> {
        Ok(format!(
            "{}, care level {}, {} medication(s).",
            patient.name,
            patient.care_level,
            patient.medications.len()
        ))
    }

    async fn predict_care_needs(&self, patient: &PatientSnapshot) -> AssistantResult<CarePrediction> {
        let mut needs = vec!["basic care".to_string()];
        if !patient.medications.is_empty() {
            needs.push("medication administration".into());
        }
        if patient.care_level >= 3 {
            needs.push("mobility support".into());
        }
        Ok(CarePrediction {
            needs,
            suggested_care_level: Some(patient.care_level),
            rationale: "derived from care level and medication list".into(),
        })
    }

    async fn suggest_tour_order(&self, stops: &[TourStopSnapshot]) -> AssistantResult<TourOrderSuggestion> {
        let patient_ids = match &self.tour_order {
            Some(order) => order.clone(),
            None => nearest_neighbour(stops),
        };
        Ok(TourOrderSuggestion {
            patient_ids,
            reasoning: Some("nearest neighbour".into()),
        })
    }

    async fn suggest_schedule(&self, _: &ScheduleRequest) -> AssistantResult<ScheduleSuggestion> {
        Ok(ScheduleSuggestion {
            suggestions: Vec::new(),
            notes: Some("mock assistant makes no schedule proposals".into()),
        })
    }

    async fn enhance_billing_text(&self, text: &str) -> AssistantResult<String> {
        clean_text_response(&tidy_sentence(text))
    }

    async fn clean_transcription(&self, text: &str) -> AssistantResult<String> {
        clean_text_response(&tidy_sentence(text))
    }

    async fn extract_patient_data(&self, image: &ImageInput) -> AssistantResult<ExtractedPatient> {
        if image.data_base64.trim().is_empty() {
            return Err(AssistantError::InvalidFormat("empty image".into()));
        }
        Ok(ExtractedPatient {
            first_name: Some("Erika".into()),
            last_name: Some("Mustermann".into()),
            ..Default::default()
        })
    }
}
