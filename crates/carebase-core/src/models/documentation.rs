//! Care documentation models.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Documentation review status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentationStatus {
    /// Written, not yet looked at
    Pending,
    /// Under review by a nurse in charge
    Review,
    /// Signed off
    Completed,
}

impl DocumentationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentationStatus::Pending => "pending",
            DocumentationStatus::Review => "review",
            DocumentationStatus::Completed => "completed",
        }
    }

    /// Status moves one step at a time, in either direction.
    pub fn can_transition_to(self, next: DocumentationStatus) -> bool {
        use DocumentationStatus::*;
        matches!(
            (self, next),
            (Pending, Review) | (Review, Pending) | (Review, Completed) | (Completed, Review)
        ) || self == next
    }
}

impl FromStr for DocumentationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentationStatus::Pending),
            "review" => Ok(DocumentationStatus::Review),
            "completed" => Ok(DocumentationStatus::Completed),
            other => Err(format!("unknown documentation status: {}", other)),
        }
    }
}

/// A dated care note about a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Documentation {
    pub id: String,
    pub patient_id: String,
    pub tour_id: Option<String>,
    pub shift_id: Option<String>,
    pub author_id: Option<String>,
    pub date: NaiveDate,
    pub content: String,
    pub status: DocumentationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Documentation {
    pub fn new(patient_id: String, date: NaiveDate, content: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            tour_id: None,
            shift_id: None,
            author_id: None,
            date,
            content,
            status: DocumentationStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Input for creating a documentation entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocumentation {
    pub patient_id: String,
    pub tour_id: Option<String>,
    pub shift_id: Option<String>,
    pub author_id: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub content: String,
}

impl NewDocumentation {
    pub fn into_documentation(self) -> Documentation {
        let mut doc = Documentation::new(self.patient_id, self.date, self.content);
        doc.tour_id = self.tour_id;
        doc.shift_id = self.shift_id;
        doc.author_id = self.author_id;
        doc
    }
}

/// Partial update; status changes go through the status endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentationPatch {
    pub tour_id: Option<String>,
    pub shift_id: Option<String>,
    pub author_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub content: Option<String>,
}

impl DocumentationPatch {
    pub fn apply(self, doc: &mut Documentation) {
        if let Some(v) = self.tour_id {
            doc.tour_id = Some(v);
        }
        if let Some(v) = self.shift_id {
            doc.shift_id = Some(v);
        }
        if let Some(v) = self.author_id {
            doc.author_id = Some(v);
        }
        if let Some(v) = self.date {
            doc.date = v;
        }
        if let Some(v) = self.content {
            doc.content = v;
        }
        doc.touch();
    }
}
