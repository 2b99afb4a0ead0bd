//! `/patients/` endpoints. Every operation is scoped to the authenticated owner.

use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, AuthUser};
use crate::AppState;
use api_shared::{MessageRes, PatientEnvelope, PatientListRes, PatientReq, PatientRes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    get,
    path = "/patients/",
    tag = "patients",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patients created by the caller", body = PatientListRes),
        (status = 401, description = "Not authenticated")
    )
)]
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<PatientListRes>> {
    let patients: Vec<PatientRes> = state
        .patients
        .list(user.id)
        .await?
        .iter()
        .map(|p| p.to_res())
        .collect();
    Ok(Json(PatientListRes {
        count: patients.len(),
        patients,
    }))
}

#[utoipa::path(
    post,
    path = "/patients/",
    tag = "patients",
    security(("bearer" = [])),
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient created", body = PatientEnvelope),
        (status = 400, description = "Field-keyed validation errors"),
        (status = 401, description = "Not authenticated")
    )
)]
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<PatientReq>,
) -> ApiResult<(StatusCode, Json<PatientEnvelope>)> {
    let patient = state.patients.create(user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(PatientEnvelope {
            message: "Patient created successfully".into(),
            patient: patient.to_res(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/",
    tag = "patients",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = PatientRes),
        (status = 404, description = "No such patient owned by the caller")
    )
)]
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<PatientRes>> {
    let patient = state.patients.get(user.id, id).await?;
    Ok(Json(patient.to_res()))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/",
    tag = "patients",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Patient id")),
    request_body = PatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientEnvelope),
        (status = 400, description = "Field-keyed validation errors"),
        (status = 404, description = "No such patient owned by the caller")
    )
)]
/// Partial update; omitted fields keep their values.
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<PatientReq>,
) -> ApiResult<Json<PatientEnvelope>> {
    let patient = state.patients.update(user.id, id, req).await?;
    Ok(Json(PatientEnvelope {
        message: "Patient updated successfully".into(),
        patient: patient.to_res(),
    }))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}/",
    tag = "patients",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient and its mappings deleted", body = MessageRes),
        (status = 404, description = "No such patient owned by the caller")
    )
)]
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<(StatusCode, Json<MessageRes>)> {
    let patient = state.patients.delete(user.id, id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        Json(MessageRes {
            message: format!("Patient {} deleted successfully", patient.full_name()),
        }),
    ))
}
