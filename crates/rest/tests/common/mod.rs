//! Common test utilities for API testing.

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{Value, json};
use tbi_persistence::backends::sqlite::SqliteBackend;
use tbi_persistence::core::PatientStorage;
use tbi_rest::{AppState, ServerConfig};

/// Creates a test server over a fresh in-memory SQLite database.
pub fn sqlite_server() -> TestServer {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to init schema");
    server_for(backend)
}

/// Creates a test server over any backend.
pub fn server_for<S: PatientStorage + 'static>(backend: S) -> TestServer {
    let state = AppState::new(backend, ServerConfig::for_testing());
    let app = tbi_rest::routing::create_routes(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// A minimal valid registration body.
pub fn patient_body(record_id: &str, sex: &str, admission_date: &str) -> Value {
    json!({
        "record_id": record_id,
        "age": 40,
        "sex": sex,
        "admission_date": admission_date,
        "diagnosis": "Diffuse axonal injury"
    })
}

/// The HC-001 motorcycle case.
pub fn hc001_body() -> Value {
    json!({
        "record_id": "HC-001",
        "age": 34,
        "sex": "male",
        "admission_date": "2024-03-01",
        "diagnosis": "Severe TBI",
        "injury_origin": "motorcycle accident",
        "helmet_use": false,
        "requires_icp": true,
        "glasgow_on_admission": 8,
        "glasgow_current": 8,
        "notes": "Admitted from the emergency room"
    })
}
