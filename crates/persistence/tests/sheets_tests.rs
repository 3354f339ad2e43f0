//! Google Sheets backend tests against a fake Sheets API.

#![cfg(feature = "sheets")]

mod common;

use chrono::Utc;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use common::hc001;
use tbi_persistence::backends::sheets::{
    ServiceAccountKey, SheetsAuth, SheetsBackend, SheetsConfig,
};
use tbi_persistence::PatientService;
use tbi_persistence::core::{Backend, PatientStorage};
use tbi_persistence::types::{EvolutionColumn, Patient, PatientColumn, PatientUpdate};

const SPREADSHEET: &str = "/v4/spreadsheets/sheet-id";

fn config(server: &MockServer, auth: SheetsAuth) -> SheetsConfig {
    SheetsConfig::new("sheet-id", auth).with_api_base(format!("{}/v4/spreadsheets", server.uri()))
}

fn backend(server: &MockServer) -> SheetsBackend {
    SheetsBackend::new(config(server, SheetsAuth::StaticToken("test-token".to_string()))).unwrap()
}

fn values_path(range: &str) -> String {
    format!("{}/values/{}", SPREADSHEET, range)
}

fn values(rows: Vec<Vec<Value>>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "values": rows }))
}

fn header_row(headers: Vec<&'static str>) -> Vec<Value> {
    headers.into_iter().map(Value::from).collect()
}

/// A patient row as the Sheets API returns it: every cell formatted text.
fn sheet_patient(record_id: &str, admission_date: &str, glasgow: &str) -> Vec<Value> {
    let mut cells = vec![json!(""); PatientColumn::ALL.len()];
    let mut set = |column: PatientColumn, value: &str| cells[column.index()] = json!(value);
    set(PatientColumn::RecordId, record_id);
    set(PatientColumn::Age, "34");
    set(PatientColumn::Sex, "Masculino");
    set(PatientColumn::AdmissionDate, admission_date);
    set(PatientColumn::Diagnosis, "Severe TBI");
    set(PatientColumn::InjuryOrigin, "motorcycle accident");
    set(PatientColumn::RequiresIcp, "TRUE");
    set(PatientColumn::RequiresVentilation, "FALSE");
    set(PatientColumn::HasDrain, "FALSE");
    set(PatientColumn::GlasgowOnAdmission, "8");
    set(PatientColumn::GlasgowCurrent, glasgow);
    set(PatientColumn::PostIcuDestination, "still-in-icu");
    set(PatientColumn::CreatedAt, "2024-03-01T08:00:00.000000Z");
    set(PatientColumn::UpdatedAt, "2024-03-01T08:00:00.000000Z");
    cells
}

fn body_json(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap_or(Value::Null)
}

// ============================================================================
// Insert
// ============================================================================

#[tokio::test]
async fn test_insert_appends_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(values(vec![vec![json!("record_id")], vec![json!("HC-000")]]))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(values_path("pacientes!A:W:append")))
        .and(query_param("valueInputOption", "RAW"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(|request: &Request| {
            let row = &body_json(request)["values"][0];
            row[PatientColumn::RecordId.index()] == "HC-001"
                && row[PatientColumn::HelmetUse.index()] == false
                && row[PatientColumn::DrainType.index()] == ""
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "updates": { "updatedRange": "pacientes!A3:W3", "updatedRows": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let patient = Patient::from_draft(hc001(), Utc::now());
    assert!(backend(&server).insert_patient(&patient).await.unwrap());
}

#[tokio::test]
async fn test_insert_existing_id_is_duplicate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .respond_with(values(vec![vec![json!("record_id")], vec![json!("HC-001")]]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(values_path("pacientes!A:W:append")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let patient = Patient::from_draft(hc001(), Utc::now());
    assert!(!backend(&server).insert_patient(&patient).await.unwrap());
}

#[tokio::test]
async fn test_padded_record_id_matches_its_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .respond_with(values(vec![
            header_row(PatientColumn::headers()),
            sheet_patient("HC-001 ", "2024-03-01", "8"),
        ]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(values_path("pacientes!A:W:append")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let service = PatientService::new(backend(&server));
    let mut padded = hc001();
    padded.record_id = "HC-001 ".to_string();
    assert!(service.register(padded).await.unwrap_err().is_duplicate());

    let stored = service.get(" HC-001 ").await.unwrap().unwrap();
    assert_eq!(stored.record_id, "HC-001");
}

#[tokio::test]
async fn test_insert_that_loses_race_clears_its_row() {
    let server = MockServer::start().await;
    // Existence check: not there yet.
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .respond_with(values(vec![vec![json!("record_id")], vec![json!("HC-000")]]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Verification: another writer's row landed first.
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .respond_with(values(vec![
            vec![json!("record_id")],
            vec![json!("HC-000")],
            vec![json!("HC-001")],
            vec![json!("HC-001")],
        ]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(values_path("pacientes!A:W:append")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "updates": { "updatedRange": "pacientes!A4:W4" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(values_path("pacientes!A4:W4:clear")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let patient = Patient::from_draft(hc001(), Utc::now());
    assert!(!backend(&server).insert_patient(&patient).await.unwrap());
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_fetch_all_decodes_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .respond_with(values(vec![
            header_row(PatientColumn::headers()),
            sheet_patient("HC-001", "2024-01-10", "9"),
            // A row cleared by a withdrawn insert.
            vec![json!(""), json!("")],
            sheet_patient("HC-002", "2024-03-10", "not a number"),
        ]))
        .mount(&server)
        .await;

    let patients = backend(&server).fetch_all().await.unwrap();
    assert_eq!(patients.len(), 2);
    assert_eq!(patients[0].record_id, "HC-002");
    assert_eq!(patients[0].glasgow_current, 0);

    let p = &patients[1];
    assert_eq!(p.record_id, "HC-001");
    assert_eq!(p.age, 34);
    assert!(p.requires_icp);
    assert!(!p.requires_ventilation);
    assert_eq!(p.helmet_use, None);
    assert_eq!(p.glasgow_current, 9);
}

#[tokio::test]
async fn test_fetch_all_empty_sheet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "range": "pacientes!A1:W1" })))
        .mount(&server)
        .await;

    assert!(backend(&server).fetch_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_evolutions_filters_and_orders() {
    let server = MockServer::start().await;
    let row = |id: &str, at: &str, glasgow: &str, note: &str| {
        let mut cells = vec![json!(""); EvolutionColumn::ALL.len()];
        cells[EvolutionColumn::RecordId.index()] = json!(id);
        cells[EvolutionColumn::RecordedAt.index()] = json!(at);
        cells[EvolutionColumn::GlasgowCurrent.index()] = json!(glasgow);
        cells[EvolutionColumn::Note.index()] = json!(note);
        cells
    };
    Mock::given(method("GET"))
        .and(path(values_path("evoluciones!A:H")))
        .respond_with(values(vec![
            header_row(EvolutionColumn::headers()),
            row("HC-001", "2024-03-02T09:00:00.000000Z", "10", "first"),
            row("HC-002", "2024-03-02T10:00:00.000000Z", "14", "other patient"),
            row("HC-001", "2024-03-03T09:00:00.000000Z", "12", "second"),
            row("HC-001", "2024-03-03T09:00:00.000000Z", "13", "same instant, appended later"),
        ]))
        .mount(&server)
        .await;

    let evolutions = backend(&server).fetch_evolutions("HC-001").await.unwrap();
    let notes: Vec<&str> = evolutions.iter().map(|e| e.note.as_str()).collect();
    assert_eq!(notes, vec!["same instant, appended later", "second", "first"]);
    assert_eq!(evolutions[0].glasgow_current, Some(13));
    assert_eq!(evolutions[0].icu_days_elapsed, None);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_writes_cells_and_evolution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .respond_with(values(vec![
            header_row(PatientColumn::headers()),
            sheet_patient("HC-000", "2024-01-10", "15"),
            sheet_patient("HC-001", "2024-03-01", "8"),
        ]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/values:batchUpdate", SPREADSHEET)))
        .and(body_partial_json(json!({ "valueInputOption": "RAW" })))
        .and(|request: &Request| {
            let body = body_json(request);
            let Some(data) = body["data"].as_array() else {
                return false;
            };
            let ranges: Vec<&str> = data.iter().filter_map(|d| d["range"].as_str()).collect();
            ranges == vec!["pacientes!P3", "pacientes!W3"] && data[0]["values"][0][0] == 11
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(values_path("evoluciones!A:H:append")))
        .and(|request: &Request| {
            let row = &body_json(request)["values"][0];
            row[EvolutionColumn::RecordId.index()] == "HC-001"
                && row[EvolutionColumn::GlasgowCurrent.index()] == 11
                && row[EvolutionColumn::IcuDaysElapsed.index()] == ""
                && row[EvolutionColumn::Note.index()] == "improving"
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "updates": { "updatedRange": "evoluciones!A2:H2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = PatientUpdate {
        glasgow_current: Some(11),
        evolution_note: Some("improving".to_string()),
        ..Default::default()
    };
    assert!(backend(&server).update_patient("HC-001", &update).await.unwrap());
}

#[tokio::test]
async fn test_update_unknown_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .respond_with(values(vec![
            header_row(PatientColumn::headers()),
            sheet_patient("HC-000", "2024-01-10", "15"),
        ]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let update = PatientUpdate {
        glasgow_current: Some(11),
        ..Default::default()
    };
    assert!(!backend(&server).update_patient("HC-404", &update).await.unwrap());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_initialize_creates_missing_sheet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SPREADSHEET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [{ "properties": { "title": "pacientes" } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}:batchUpdate", SPREADSHEET)))
        .and(body_partial_json(json!({
            "requests": [{ "addSheet": { "properties": { "title": "evoluciones" } } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(values_path("evoluciones!A1:H1")))
        .and(body_partial_json(json!({ "values": [EvolutionColumn::headers()] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    backend.initialize().await.unwrap();
    backend.health_check().await.unwrap();
}

#[tokio::test]
async fn test_initialize_tolerates_forbidden_spreadsheet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("caller does not have permission"))
        .mount(&server)
        .await;

    let backend = backend(&server);
    assert!(backend.initialize().await.is_ok());
    assert!(backend.health_check().await.is_err());
}

#[tokio::test]
async fn test_service_account_token_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(|request: &Request| {
            let body = String::from_utf8_lossy(&request.body);
            body.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
                && body.contains("assertion=")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.minted",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(values_path("pacientes!A:W")))
        .and(header("authorization", "Bearer ya29.minted"))
        .respond_with(values(vec![header_row(PatientColumn::headers())]))
        .expect(2)
        .mount(&server)
        .await;

    let key = ServiceAccountKey {
        client_email: "registry@project.iam.gserviceaccount.com".to_string(),
        private_key: include_str!("fixtures/test_service_account.pem").to_string(),
        private_key_id: Some("key-1".to_string()),
        token_uri: format!("{}/token", server.uri()),
    };
    let backend = SheetsBackend::new(config(&server, SheetsAuth::ServiceAccount(key))).unwrap();

    assert!(backend.fetch_all().await.unwrap().is_empty());
    assert!(backend.fetch_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_is_unsupported() {
    let server = MockServer::start().await;
    assert!(backend(&server).delete_patient("HC-001").await.is_err());
}
