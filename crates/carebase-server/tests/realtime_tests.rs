//! Real-time message handling, exercised without a socket.

use std::sync::Arc;

use carebase_core::models::{
    CareLevel, DocumentationStatus, NewDocumentation, NewEmployee, NewPatient, NewTour,
};
use carebase_core::routing::Coordinates;
use carebase_core::CareCore;
use carebase_llm::{CareAssistant, DisabledAssistant, MockAssistant};
use carebase_server::realtime::{handle_text, ServerMessage};
use carebase_server::AppState;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use tokio::sync::mpsc;

fn state(assistant: Arc<dyn CareAssistant>) -> AppState {
    AppState::new(CareCore::open_in_memory().unwrap(), assistant)
}

fn patient(core: &CareCore, name: &str, lat: f64) -> String {
    core.create_patient(NewPatient {
        first_name: name.into(),
        last_name: "Test".into(),
        birth_date: None,
        care_level: CareLevel::new(2).unwrap(),
        address: String::new(),
        location: Some(Coordinates::new(lat, 13.40)),
        phone: None,
        medications: Vec::new(),
        insurance: Default::default(),
        emergency_contact: None,
        notes: None,
    })
    .unwrap()
    .id
}

fn employee(core: &CareCore) -> String {
    core.create_employee(NewEmployee {
        first_name: "Anna".into(),
        last_name: "Schmidt".into(),
        role: "nurse".into(),
        email: None,
        phone: None,
        qualifications: Default::default(),
        working_hours: Default::default(),
        max_patients_per_day: None,
    })
    .unwrap()
    .id
}

fn tour(core: &CareCore, employee_id: &str, hour: u32, patient_ids: Vec<String>) -> String {
    core.create_tour(NewTour {
        employee_id: employee_id.into(),
        date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        start_time: NaiveTime::from_hms_opt(hour, 0, 0),
        patient_ids,
    })
    .unwrap()
    .tour
    .id
}

async fn exchange(state: &AppState, origin: u64, text: &str) -> Vec<ServerMessage> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle_text(state, origin, text, &tx).await;
    drop(tx);
    let mut out = Vec::new();
    while let Some(msg) = rx.recv().await {
        out.push(msg);
    }
    out
}

#[tokio::test]
async fn test_malformed_envelope_yields_error() {
    let state = state(Arc::new(MockAssistant::new()));
    let (_, mut others) = state.hub.connect();

    for text in ["not json", r#"{"type":"LAUNCH"}"#, r#"{"type":"TOUR_UPDATE"}"#] {
        let replies = exchange(&state, 1, text).await;
        assert_eq!(replies.len(), 1, "{}", text);
        assert!(matches!(replies[0], ServerMessage::Error { .. }));
    }
    assert!(others.try_recv().is_err(), "errors are not broadcast");
}

#[tokio::test]
async fn test_tour_update_is_relayed_to_others() {
    let state = state(Arc::new(MockAssistant::new()));
    let nurse = employee(&state.core);
    let p1 = patient(&state.core, "P1", 52.50);
    let tour_id = tour(&state.core, &nurse, 8, vec![p1]);

    let (sender, _) = state.hub.connect();
    let (_, mut listener) = state.hub.connect();

    let text = json!({"type": "TOUR_UPDATE", "tour_id": &tour_id}).to_string();
    let replies = exchange(&state, sender, &text).await;
    assert!(replies.is_empty());

    let envelope = listener.recv().await.unwrap();
    assert_eq!(envelope.origin, Some(sender));
    assert_eq!(envelope.message, ServerMessage::TourUpdated { tour_id });
}

#[tokio::test]
async fn test_unknown_tour_update_is_rejected() {
    let state = state(Arc::new(MockAssistant::new()));
    let replies = exchange(&state, 1, r#"{"type":"TOUR_UPDATE","tour_id":"ghost"}"#).await;
    assert!(matches!(replies.as_slice(), [ServerMessage::Error { .. }]));
}

#[tokio::test]
async fn test_doc_status_update_persists_and_broadcasts() {
    let state = state(Arc::new(MockAssistant::new()));
    let p1 = patient(&state.core, "P1", 52.50);
    let doc = state
        .core
        .create_documentation(NewDocumentation {
            patient_id: p1,
            tour_id: None,
            shift_id: None,
            author_id: None,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            content: "Wundversorgung".into(),
        })
        .unwrap();
    let (sender, _) = state.hub.connect();
    let (_, mut listener) = state.hub.connect();

    let text = json!({"type": "DOC_STATUS_UPDATE", "documentation_id": &doc.id, "status": "review"})
        .to_string();
    let expected = ServerMessage::DocStatusUpdated {
        documentation_id: doc.id.clone(),
        status: DocumentationStatus::Review,
    };
    assert_eq!(exchange(&state, sender, &text).await, vec![expected.clone()]);

    assert_eq!(
        state.core.get_documentation(&doc.id).unwrap().status,
        DocumentationStatus::Review
    );
    let envelope = listener.recv().await.unwrap();
    assert_eq!(envelope.origin, Some(sender));
    assert_eq!(envelope.message, expected);

    // pending -> completed skips review
    let text = json!({"type": "DOC_STATUS_UPDATE", "documentation_id": &doc.id, "status": "pending"})
        .to_string();
    exchange(&state, sender, &text).await;
    let text = json!({"type": "DOC_STATUS_UPDATE", "documentation_id": &doc.id, "status": "completed"})
        .to_string();
    let replies = exchange(&state, sender, &text).await;
    assert!(matches!(replies.as_slice(), [ServerMessage::Error { .. }]));
}

#[tokio::test]
async fn test_optimize_tour_replies_and_notifies() {
    let state = state(Arc::new(MockAssistant::new()));
    let nurse = employee(&state.core);
    let home = patient(&state.core, "Home", 52.50);
    let far = patient(&state.core, "Far", 52.60);
    let near = patient(&state.core, "Near", 52.51);
    let first = tour(&state.core, &nurse, 8, vec![home.clone(), far.clone(), near.clone()]);
    let second = tour(&state.core, &nurse, 14, vec![patient(&state.core, "Later", 52.50)]);

    let (sender, _) = state.hub.connect();
    let (_, mut listener) = state.hub.connect();

    let text = json!({"type": "OPTIMIZE_TOUR", "tour_id": &first}).to_string();
    let replies = exchange(&state, sender, &text).await;
    match replies.as_slice() {
        [ServerMessage::OptimizedTour { tour, applied, .. }] => {
            assert!(applied);
            assert_eq!(tour.patient_ids, vec![home, near, far]);
        }
        other => panic!("unexpected replies: {:?}", other),
    }

    let mut updated = Vec::new();
    while let Ok(envelope) = listener.try_recv() {
        assert_eq!(envelope.origin, Some(sender));
        if let ServerMessage::TourUpdated { tour_id } = envelope.message {
            updated.push(tour_id);
        }
    }
    assert_eq!(updated, vec![first, second]);
}

#[tokio::test]
async fn test_voice_transcription_appends_to_documentation() {
    let state = state(Arc::new(MockAssistant::new()));
    let p1 = patient(&state.core, "P1", 52.50);
    let doc = state
        .core
        .create_documentation(NewDocumentation {
            patient_id: p1,
            tour_id: None,
            shift_id: None,
            author_id: None,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            content: "Blutdruck gemessen.".into(),
        })
        .unwrap();

    let text = json!({
        "type": "VOICE_TRANSCRIPTION",
        "text": "  patientin   wirkt müde ",
        "documentation_id": doc.id
    })
    .to_string();
    let replies = exchange(&state, 1, &text).await;

    assert!(matches!(replies.first(), Some(ServerMessage::TranscriptionProgress { .. })));
    assert_eq!(
        replies.last(),
        Some(&ServerMessage::TranscriptionComplete {
            text: "Patientin wirkt müde.".into()
        })
    );
    assert_eq!(
        state.core.get_documentation(&doc.id).unwrap().content,
        "Blutdruck gemessen.\nPatientin wirkt müde."
    );
}

#[tokio::test]
async fn test_voice_transcription_without_assistant() {
    let state = state(Arc::new(DisabledAssistant));
    let text = json!({"type": "VOICE_TRANSCRIPTION", "text": "hallo welt"}).to_string();
    let replies = exchange(&state, 1, &text).await;

    assert_eq!(
        replies.last(),
        Some(&ServerMessage::TranscriptionError {
            message: "could not clean up the transcription: Assistant unavailable: no AI provider configured".into(),
            original_text: "hallo welt".into(),
        })
    );
}
