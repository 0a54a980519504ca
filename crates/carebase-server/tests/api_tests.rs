//! HTTP tests against the router served on an ephemeral port.

use std::sync::Arc;

use carebase_core::CareCore;
use carebase_llm::{CareAssistant, DisabledAssistant, MockAssistant};
use carebase_server::{serve, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct TestServer {
    base: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(assistant: Arc<dyn CareAssistant>) -> Self {
        let core = CareCore::open_in_memory().unwrap();
        let state = AppState::new(core, assistant);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state, std::future::pending()));

        Self {
            base: format!("http://{}/api", addr),
            client: reqwest::Client::new(),
        }
    }

    async fn mock() -> Self {
        Self::start(Arc::new(MockAssistant::new())).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PATCH, path, body).await
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.client.delete(self.url(path)).send().await.unwrap().status()
    }

    async fn patient(&self, first: &str, lat: f64, lng: f64) -> String {
        let (status, body) = self
            .post(
                "/patients",
                json!({
                    "first_name": first,
                    "last_name": "Test",
                    "care_level": 1,
                    "location": {"lat": lat, "lng": lng},
                    "insurance": {"provider": "AOK", "number": "A123"}
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    async fn employee(&self) -> String {
        let (status, body) = self
            .post("/employees", json!({"first_name": "Anna", "last_name": "Schmidt", "role": "nurse"}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    async fn tour(&self, employee: &str, start: &str, patients: &[&str]) -> Value {
        let (status, body) = self
            .post(
                "/tours",
                json!({
                    "employee_id": employee,
                    "date": "2024-06-03",
                    "start_time": start,
                    "patient_ids": patients
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["tour"].clone()
    }
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::mock().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_patient_crud() {
    let server = TestServer::mock().await;
    let id = server.patient("Erika", 52.52, 13.40).await;

    let (status, body) = server.get(&format!("/patients/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Erika");

    let (status, body) = server
        .patch(&format!("/patients/{}", id), json!({"care_level": 4}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["care_level"], 4);
    assert_eq!(body["insurance"]["provider"], "AOK");

    let (_, list) = server.get("/patients").await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    assert_eq!(server.delete(&format!("/patients/{}", id)).await, StatusCode::NO_CONTENT);
    let (status, _) = server.get(&format!("/patients/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_error_shape() {
    let server = TestServer::mock().await;

    let (status, body) = server.get("/patients/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("nope"));

    let (status, body) = server
        .post("/patients", json!({"first_name": "A", "last_name": "B", "care_level": 9}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_tour_edit_cascades_later_tours() {
    let server = TestServer::mock().await;
    let nurse = server.employee().await;
    let p1 = server.patient("P1", 52.52, 13.40).await;
    let p2 = server.patient("P2", 52.52, 13.40).await;
    let p3 = server.patient("P3", 52.52, 13.40).await;

    let a = server.tour(&nurse, "08:00:00", &[&p1, &p2]).await;
    let b = server.tour(&nurse, "10:30:00", &[&p3]).await;
    assert_eq!(a["optimized_route"]["estimated_duration"], 60);

    let a_id = a["id"].as_str().unwrap();
    let b_id = b["id"].as_str().unwrap();
    let resp = server
        .client
        .delete(server.url(&format!("/tours/{}/patients/{}", a_id, p2)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mutation: Value = resp.json().await.unwrap();
    assert_eq!(mutation["shifted_tour_ids"], json!([b_id]));
    assert_eq!(mutation["tour"]["optimized_route"]["estimated_duration"], 30);

    // Same location, so no travel between the tours.
    let (_, b) = server.get(&format!("/tours/{}", b_id)).await;
    assert_eq!(b["start_time"], "2024-06-03T08:30:00");

    let (_, listed) = server
        .get(&format!("/tours?date=2024-06-03&employee_id={}", nurse))
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_add_duplicate_patient_conflicts() {
    let server = TestServer::mock().await;
    let nurse = server.employee().await;
    let p1 = server.patient("P1", 52.52, 13.40).await;
    let tour = server.tour(&nurse, "08:00:00", &[&p1]).await;

    let (status, body) = server
        .post(
            &format!("/tours/{}/patients", tour["id"].as_str().unwrap()),
            json!({"patient_id": &p1}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_optimize_applies_nearest_neighbour_order() {
    let server = TestServer::mock().await;
    let nurse = server.employee().await;
    let home = server.patient("Home", 52.50, 13.40).await;
    let far = server.patient("Far", 52.60, 13.40).await;
    let near = server.patient("Near", 52.51, 13.40).await;
    let tour = server.tour(&nurse, "08:00:00", &[&home, &far, &near]).await;

    let (status, body) = server
        .post(&format!("/tours/{}/optimize", tour["id"].as_str().unwrap()), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(body["tour"]["patient_ids"], json!([home, near, far]));
}

#[tokio::test]
async fn test_optimize_ignores_foreign_order() {
    let server = TestServer::start(Arc::new(MockAssistant::with_tour_order(vec![
        "someone-else".into(),
        "another".into(),
    ])))
    .await;
    let nurse = server.employee().await;
    let p1 = server.patient("P1", 52.50, 13.40).await;
    let p2 = server.patient("P2", 52.60, 13.40).await;
    let tour = server.tour(&nurse, "08:00:00", &[&p1, &p2]).await;

    let (status, body) = server
        .post(&format!("/tours/{}/optimize", tour["id"].as_str().unwrap()), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);
    assert!(body["message"].is_string());
    assert_eq!(body["tour"]["patient_ids"], json!([p1, p2]));
}

#[tokio::test]
async fn test_disabled_assistant() {
    let server = TestServer::start(Arc::new(DisabledAssistant)).await;
    let p1 = server.patient("P1", 52.50, 13.40).await;

    let (status, body) = server.get(&format!("/patients/{}/summary", p1)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");

    let (status, body) = server
        .post("/billings/enhance", json!({"text": "hausbesuch grundpflege"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enhanced"], false);
    assert_eq!(body["text"], "hausbesuch grundpflege");
    assert!(body["message"].is_string());

    let nurse = server.employee().await;
    let p2 = server.patient("P2", 52.60, 13.40).await;
    let tour = server.tour(&nurse, "08:00:00", &[&p1, &p2]).await;
    let (status, body) = server
        .post(&format!("/tours/{}/optimize", tour["id"].as_str().unwrap()), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);
}

#[tokio::test]
async fn test_mock_summary_and_prediction() {
    let server = TestServer::mock().await;
    let p1 = server.patient("Erika", 52.50, 13.40).await;

    let (status, body) = server.get(&format!("/patients/{}/summary", p1)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["summary"].as_str().unwrap().starts_with("Erika Test"));

    let (status, body) = server.get(&format!("/patients/{}/care-prediction", p1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggested_care_level"], 1);
}

#[tokio::test]
async fn test_billing_gate_over_http() {
    let server = TestServer::mock().await;
    let nurse = server.employee().await;
    let p1 = server.patient("P1", 52.50, 13.40).await;
    let tour = server.tour(&nurse, "08:00:00", &[&p1]).await;
    let tour_id = tour["id"].as_str().unwrap();

    let billing = json!({
        "patient_id": &p1,
        "period_start": "2024-06-01",
        "period_end": "2024-06-30"
    });
    let (status, body) = server.post("/billings", billing.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");
    assert_eq!(body["missing"], json!([{"date": "2024-06-03", "type": "tour", "id": tour_id}]));

    let (_, missing) = server
        .get(&format!(
            "/billings/missing-documentation?patient_id={}&from=2024-06-01&to=2024-06-30",
            p1
        ))
        .await;
    assert_eq!(missing.as_array().unwrap().len(), 1);

    let (status, _) = server
        .post(
            "/documentation",
            json!({
                "patient_id": &p1,
                "tour_id": &tour_id,
                "date": "2024-06-03",
                "content": "Grundpflege durchgeführt"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, services) = server
        .get(&format!("/billings/suggest?patient_id={}&from=2024-06-01&to=2024-06-30", p1))
        .await;
    assert_eq!(services[0]["code"], "HV-L1");
    assert_eq!(services[0]["quantity"], 30);

    let mut billing = billing;
    billing["services"] = services;
    let (status, created) = server.post("/billings", billing).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["status"], "draft");
    assert_eq!(created["insurance_provider"], "AOK");
    assert_eq!(created["total_cents"], 30 * 50);

    let id = created["id"].as_str().unwrap();
    let (status, _) = server
        .post(&format!("/billings/{}/status", id), json!({"status": "paid"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let resp = server
        .client
        .get(server.url("/billings/export?format=csv"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("text/csv"));
    let csv = resp.text().await.unwrap();
    assert!(csv.starts_with("billing_id,"));
    assert!(csv.contains("HV-L1"));
}

#[tokio::test]
async fn test_forced_billing_skips_gate() {
    let server = TestServer::mock().await;
    let nurse = server.employee().await;
    let p1 = server.patient("P1", 52.50, 13.40).await;
    server.tour(&nurse, "08:00:00", &[&p1]).await;

    let (status, body) = server
        .post(
            "/billings",
            json!({
                "patient_id": &p1,
                "period_start": "2024-06-01",
                "period_end": "2024-06-30",
                "force": true
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

#[tokio::test]
async fn test_shift_conflict_dry_run() {
    let server = TestServer::mock().await;
    let nurse = server.employee().await;
    let (status, _) = server
        .post(
            "/shifts",
            json!({
                "employee_id": &nurse,
                "start_time": "2024-06-03T10:00:00",
                "end_time": "2024-06-03T14:00:00",
                "shift_type": "regular"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, report) = server
        .post(
            "/shifts/conflicts",
            json!({
                "employee_id": &nurse,
                "start_time": "2024-06-03T14:00:00",
                "end_time": "2024-06-03T18:00:00"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["has_conflicts"], false);

    let (_, report) = server
        .post(
            "/shifts/conflicts",
            json!({
                "employee_id": &nurse,
                "start_time": "2024-06-03T13:00:00",
                "end_time": "2024-06-03T18:00:00"
            }),
        )
        .await;
    assert_eq!(report["has_conflicts"], true);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 1);

    let (_, shifts) = server.get(&format!("/shifts?employee_id={}", nurse)).await;
    assert_eq!(shifts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_expiry_items_within_days() {
    let server = TestServer::mock().await;
    let soon = (chrono::Local::now().date_naive() + chrono::Duration::days(3)).to_string();
    let later = (chrono::Local::now().date_naive() + chrono::Duration::days(90)).to_string();

    for (name, date) in [("Insulin", &soon), ("Verband", &later)] {
        let (status, _) = server
            .post("/expiry-items", json!({"name": name, "quantity": 2, "expiry_date": date}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, items) = server.get("/expiry-items?within_days=7").await;
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Insulin");
}
