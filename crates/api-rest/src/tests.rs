use super::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::Duration;
use clinic_core::db::connect_in_memory;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let pool = connect_in_memory().await.unwrap();
    let auth = AuthConfig::new("test-secret", Duration::minutes(5), Duration::days(1)).unwrap();
    AppState::new(pool, auth)
}

async fn send(
    state: &AppState,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register `username` and return its (access, refresh) tokens.
async fn sign_up(state: &AppState, username: &str) -> (String, String) {
    let (status, body) = send(
        state,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password123",
            "password_confirm": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "User registered successfully");
    (
        body["tokens"]["access"].as_str().unwrap().to_string(),
        body["tokens"]["refresh"].as_str().unwrap().to_string(),
    )
}

fn jo() -> Value {
    json!({
        "first_name": "Jo",
        "last_name": "Doe",
        "email": "jo@x.com",
        "phone": "0123456789",
        "date_of_birth": "1990-01-01",
        "gender": "F",
        "address": "1 High Street",
        "city": "Leeds",
        "state": "West Yorkshire",
        "zip_code": "LS1 1AA",
    })
}

fn cardiologist() -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Heart",
        "email": "d@x.com",
        "phone": "0200000000",
        "license_number": "L1",
        "specialization": "cardiology",
        "experience_years": 12,
        "qualification": "MBBS, MD",
        "hospital_name": "General Infirmary",
        "hospital_address": "Great George Street",
        "city": "Leeds",
        "state": "West Yorkshire",
        "consultation_fee": "150.00",
        "availability": "Mon-Fri 9-5",
    })
}

async fn create(state: &AppState, uri: &str, token: &str, body: Value, key: &str) -> i64 {
    let (status, body) = send(state, Method::POST, uri, Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body[key]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_needs_no_token() {
    let state = test_state().await;
    let (status, body) = send(&state, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn assigning_the_same_doctor_twice_is_rejected() {
    let state = test_state().await;
    let (alice, _) = sign_up(&state, "alice").await;

    let jo_id = create(&state, "/patients/", &alice, jo(), "patient").await;
    let doctor_id = create(&state, "/doctors/", &alice, cardiologist(), "doctor").await;

    let mapping = json!({ "patient": jo_id, "doctor": doctor_id, "status": "active" });
    let (status, body) = send(
        &state,
        Method::POST,
        "/mappings/",
        Some(&alice),
        Some(mapping.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Patient-Doctor mapping created successfully");
    assert_eq!(body["mapping"]["status"], "active");
    assert_eq!(body["mapping"]["doctor_details"]["full_name"], "Dr. Ada Heart");

    let (status, body) = send(&state, Method::POST, "/mappings/", Some(&alice), Some(mapping)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["non_field_errors"][0].as_str().unwrap();
    assert!(message.contains("already actively assigned"), "{message}");
    assert_eq!(message, "Patient Jo Doe is already actively assigned to Dr. Ada Heart");
}

#[tokio::test]
async fn patients_are_invisible_to_other_users() {
    let state = test_state().await;
    let (alice, _) = sign_up(&state, "alice").await;
    let (bob, _) = sign_up(&state, "bob").await;
    let jo_id = create(&state, "/patients/", &alice, jo(), "patient").await;

    let uri = format!("/patients/{jo_id}/");
    let (status, body) = send(&state, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], error::NOT_FOUND);

    let (status, _) = send(
        &state,
        Method::PUT,
        &uri,
        Some(&bob),
        Some(json!({ "city": "York" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&state, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&state, Method::GET, "/patients/", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, body) = send(&state, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Jo Doe");
    assert_eq!(body["created_by"], "alice");
}

#[tokio::test]
async fn protected_routes_require_a_valid_access_token() {
    let state = test_state().await;
    let (_, refresh) = sign_up(&state, "alice").await;

    let (status, _) = send(&state, Method::GET, "/patients/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&state, Method::GET, "/patients/", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // a refresh token cannot stand in for an access token
    let (status, _) = send(&state, Method::GET, "/patients/", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_accounts_are_forbidden() {
    let state = test_state().await;
    let (alice, _) = sign_up(&state, "alice").await;
    state.users.set_active("alice", false).await.unwrap();

    let (status, body) = send(&state, Method::GET, "/patients/", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "User is inactive");

    let (status, body) = send(
        &state,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["non_field_errors"][0], "User account is disabled");
}

#[tokio::test]
async fn login_and_refresh_issue_working_tokens() {
    let state = test_state().await;
    sign_up(&state, "alice").await;

    let (status, body) = send(
        &state,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());

    let (status, body) = send(
        &state,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Login successful");
    let refresh = body["tokens"]["refresh"].as_str().unwrap().to_string();

    let (status, body) = send(
        &state,
        Method::POST,
        "/token/refresh/",
        None,
        Some(json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let access = body["access"].as_str().unwrap().to_string();

    let (status, _) = send(&state, Method::GET, "/patients/", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&state, Method::POST, "/token/refresh/", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["refresh"][0], "This field is required.");

    // an access token cannot be refreshed
    let (status, _) = send(
        &state,
        Method::POST,
        "/token/refresh/",
        None,
        Some(json!({ "refresh": access })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_errors_are_field_keyed() {
    let state = test_state().await;
    sign_up(&state, "alice").await;

    let (status, body) = send(
        &state,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "password123",
            "password_confirm": "different123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array(), "{body}");
    assert_eq!(body["non_field_errors"][0], "Passwords don't match");
}

#[tokio::test]
async fn deleting_a_patient_removes_its_mappings() {
    let state = test_state().await;
    let (alice, _) = sign_up(&state, "alice").await;
    let jo_id = create(&state, "/patients/", &alice, jo(), "patient").await;
    let doctor_id = create(&state, "/doctors/", &alice, cardiologist(), "doctor").await;
    create(
        &state,
        "/mappings/",
        &alice,
        json!({ "patient": jo_id, "doctor": doctor_id }),
        "mapping",
    )
    .await;

    let mappings_uri = format!("/mappings/{jo_id}/");
    let (status, body) = send(&state, Method::GET, &mappings_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient"], "Jo Doe");
    assert_eq!(body["count"], 1);

    let (status, _) = send(
        &state,
        Method::DELETE,
        &format!("/patients/{jo_id}/"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&state, Method::GET, &mappings_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&state, Method::GET, "/mappings/", Some(&alice), None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn mapping_status_can_change_and_filter() {
    let state = test_state().await;
    let (alice, _) = sign_up(&state, "alice").await;
    let jo_id = create(&state, "/patients/", &alice, jo(), "patient").await;
    let doctor_id = create(&state, "/doctors/", &alice, cardiologist(), "doctor").await;
    let mapping_id = create(
        &state,
        "/mappings/",
        &alice,
        json!({ "patient": jo_id, "doctor": doctor_id }),
        "mapping",
    )
    .await;

    let (status, body) = send(
        &state,
        Method::PUT,
        &format!("/mappings/detail/{mapping_id}/"),
        Some(&alice),
        Some(json!({ "status": "completed", "notes": "discharged" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Mapping updated successfully");
    assert_eq!(body["mapping"]["status_display"], "Completed");

    let (_, body) = send(&state, Method::GET, "/mappings/?status=active", Some(&alice), None).await;
    assert_eq!(body["count"], 0);
    let (_, body) = send(
        &state,
        Method::GET,
        "/mappings/?status=completed",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);

    let (status, _) = send(
        &state,
        Method::DELETE,
        &format!("/mappings/detail/{mapping_id}/"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn deactivated_doctors_leave_the_directory() {
    let state = test_state().await;
    let (alice, _) = sign_up(&state, "alice").await;
    let doctor_id = create(&state, "/doctors/", &alice, cardiologist(), "doctor").await;
    let uri = format!("/doctors/{doctor_id}/");

    let (_, body) = send(
        &state,
        Method::GET,
        "/doctors/?specialization=cardiology&city=lee",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["doctors"][0]["consultation_fee"], "150.00");

    let (status, _) = send(
        &state,
        Method::PUT,
        &uri,
        Some(&alice),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&state, Method::GET, "/doctors/", Some(&alice), None).await;
    assert_eq!(body["count"], 0);
    let (status, _) = send(&state, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &state,
        Method::PUT,
        &uri,
        Some(&alice),
        Some(json!({ "is_active": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctor"]["is_active"], true);
}

#[tokio::test]
async fn choice_listings() {
    let state = test_state().await;
    let (alice, _) = sign_up(&state, "alice").await;

    let (status, body) = send(
        &state,
        Method::GET,
        "/doctors/specializations/",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["specializations"].as_array().unwrap().len(), 14);

    let (status, body) = send(
        &state,
        Method::GET,
        "/mappings/status-choices/",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status_choices"][0]["value"], "active");
}

#[tokio::test]
async fn malformed_ids_and_bodies() {
    let state = test_state().await;
    let (alice, _) = sign_up(&state, "alice").await;

    let (status, _) = send(&state, Method::GET, "/patients/abc/", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/patients/")
        .header(header::AUTHORIZATION, format!("Bearer {alice}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/patients/")
        .header(header::AUTHORIZATION, format!("Bearer {alice}"))
        .body(Body::from(json!({ "first_name": "Jo" }).to_string()))
        .unwrap();
    let response = router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));
}
