//! Supabase backend tests against a fake PostgREST endpoint.

#![cfg(feature = "supabase")]

mod common;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::hc001;
use tbi_persistence::backends::supabase::{SupabaseBackend, SupabaseConfig};
use tbi_persistence::core::{Backend, PatientStorage};
use tbi_persistence::error::{BackendError, StorageError};
use tbi_persistence::types::{Patient, PatientUpdate, PostIcuDestination, Sex};

const PATIENTS: &str = "/rest/v1/pacientes";
const EVOLUTIONS: &str = "/rest/v1/evoluciones";

fn backend(server: &MockServer) -> SupabaseBackend {
    SupabaseBackend::new(SupabaseConfig::new(server.uri(), "test-key")).unwrap()
}

fn patient_row(record_id: &str, admission_date: &str) -> serde_json::Value {
    json!({
        "record_id": record_id,
        "age": 34,
        "sex": "male",
        "admission_date": admission_date,
        "diagnosis": "Severe TBI",
        "injury_origin": "motorcycle accident",
        "helmet_use": null,
        "associated_injuries": "",
        "requires_icp": "TRUE",
        "requires_ventilation": false,
        "requires_craniectomy": "",
        "has_drain": false,
        "drain_type": null,
        "icu_days_elapsed": "4",
        "glasgow_on_admission": 8,
        "glasgow_current": "11",
        "post_icu_destination": "still-in-icu",
        "sequelae_motor": null,
        "sequelae_neurological": "False",
        "sequelae_cognitive": true,
        "notes": "",
        "created_at": "2024-03-01T08:00:00+00:00",
        "updated_at": "2024-03-02T08:00:00+00:00"
    })
}

// ============================================================================
// Insert
// ============================================================================

#[tokio::test]
async fn test_insert_new_patient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PATIENTS))
        .and(query_param("record_id", "eq.HC-001"))
        .and(header("apikey", "test-key"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PATIENTS))
        .and(body_partial_json(json!({
            "record_id": "HC-001",
            "sex": "male",
            "helmet_use": false,
            "drain_type": null,
            "glasgow_current": 8
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let patient = Patient::from_draft(hc001(), Utc::now());
    assert!(backend(&server).insert_patient(&patient).await.unwrap());
}

#[tokio::test]
async fn test_insert_existing_patient_is_duplicate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PATIENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"record_id": "HC-001"}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PATIENTS))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let patient = Patient::from_draft(hc001(), Utc::now());
    assert!(!backend(&server).insert_patient(&patient).await.unwrap());
}

#[tokio::test]
async fn test_insert_conflict_is_duplicate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PATIENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PATIENTS))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let patient = Patient::from_draft(hc001(), Utc::now());
    assert!(!backend(&server).insert_patient(&patient).await.unwrap());
}

#[tokio::test]
async fn test_rejected_key_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let patient = Patient::from_draft(hc001(), Utc::now());
    let err = backend(&server).insert_patient(&patient).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Backend(BackendError::Unavailable { .. })
    ));
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_fetch_all_coerces_and_orders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PATIENTS))
        .and(query_param("order", "admission_date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            patient_row("HC-001", "2024-01-10"),
            patient_row("", "2024-02-10"),
            patient_row("HC-002", "2024-03-10"),
        ])))
        .mount(&server)
        .await;

    let patients = backend(&server).fetch_all().await.unwrap();
    assert_eq!(patients.len(), 2);
    assert_eq!(patients[0].record_id, "HC-002");
    assert_eq!(patients[1].record_id, "HC-001");

    let p = &patients[1];
    assert_eq!(p.sex, Sex::Male);
    assert!(p.requires_icp);
    assert!(!p.requires_craniectomy);
    assert!(!p.sequelae_motor);
    assert!(!p.sequelae_neurological);
    assert!(p.sequelae_cognitive);
    assert_eq!(p.helmet_use, None);
    assert_eq!(p.icu_days_elapsed, 4);
    assert_eq!(p.glasgow_current, 11);
    assert_eq!(p.post_icu_destination, PostIcuDestination::StillInIcu);
}

#[tokio::test]
async fn test_fetch_all_empty_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PATIENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(backend(&server).fetch_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_by_record_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PATIENTS))
        .and(query_param("record_id", "eq.HC-001"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([patient_row("HC-001", "2024-01-10")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PATIENTS))
        .and(query_param("record_id", "eq.HC-404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let found = backend.fetch_by_record_id("HC-001").await.unwrap().unwrap();
    assert_eq!(found.diagnosis, "Severe TBI");
    assert!(backend.fetch_by_record_id("HC-404").await.unwrap().is_none());
}

#[tokio::test]
async fn test_fetch_evolutions_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVOLUTIONS))
        .and(query_param("record_id", "eq.HC-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "record_id": "HC-001",
                "recorded_at": "2024-03-02T09:00:00Z",
                "icu_days_elapsed": null,
                "glasgow_current": 11,
                "requires_icp": null,
                "requires_ventilation": null,
                "requires_craniectomy": null,
                "note": "improving"
            },
            {
                "record_id": "HC-001",
                "recorded_at": "2024-03-03T09:00:00Z",
                "icu_days_elapsed": 3,
                "glasgow_current": 13,
                "requires_icp": "FALSE",
                "requires_ventilation": null,
                "requires_craniectomy": null,
                "note": "stable"
            }
        ])))
        .mount(&server)
        .await;

    let evolutions = backend(&server).fetch_evolutions("HC-001").await.unwrap();
    assert_eq!(evolutions.len(), 2);
    assert_eq!(evolutions[0].note, "stable");
    assert_eq!(evolutions[0].requires_icp, Some(false));
    assert_eq!(evolutions[1].glasgow_current, Some(11));
    assert_eq!(evolutions[1].icu_days_elapsed, None);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_tracked_field_writes_evolution() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(PATIENTS))
        .and(query_param("record_id", "eq.HC-001"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({"glasgow_current": 11})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"record_id": "HC-001"}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EVOLUTIONS))
        .and(body_partial_json(json!({
            "record_id": "HC-001",
            "glasgow_current": 11,
            "icu_days_elapsed": null,
            "note": "improving"
        })))
        .respond_with(ResponseTemplate::new(201))
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
async fn test_update_untracked_field_skips_evolution() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(PATIENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"record_id": "HC-001"}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EVOLUTIONS))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let update = PatientUpdate {
        diagnosis: Some("Revised".to_string()),
        ..Default::default()
    };
    assert!(backend(&server).update_patient("HC-001", &update).await.unwrap());
}

#[tokio::test]
async fn test_update_unknown_record() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(PATIENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EVOLUTIONS))
        .respond_with(ResponseTemplate::new(201))
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
async fn test_initialize_tolerates_missing_tables() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "relation \"public.pacientes\" does not exist"
        })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    assert!(backend.initialize().await.is_ok());
    assert!(matches!(
        backend.health_check().await,
        Err(BackendError::RequestFailed { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_delete_is_unsupported() {
    let server = MockServer::start().await;
    let err = backend(&server).delete_patient("HC-001").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Backend(BackendError::UnsupportedCapability { .. })
    ));
}
