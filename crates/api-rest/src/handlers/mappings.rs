//! `/mappings/` endpoints: the assignment ledger of the authenticated owner.

use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, AuthUser};
use crate::AppState;
use api_shared::{
    MappingCreateReq, MappingEnvelope, MappingListRes, MappingRes, MappingUpdateReq, MessageRes,
    PatientMappingsRes, StatusChoicesRes, StatusFilter,
};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinic_core::{Mapping, MappingService};

fn to_res(mappings: &[Mapping]) -> Vec<MappingRes> {
    mappings.iter().map(Mapping::to_res).collect()
}

#[utoipa::path(
    get,
    path = "/mappings/",
    tag = "mappings",
    security(("bearer" = [])),
    params(StatusFilter),
    responses(
        (status = 200, description = "Mappings created by the caller", body = MappingListRes)
    )
)]
#[axum::debug_handler]
pub async fn list_mappings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Json<MappingListRes>> {
    let mappings = state
        .mappings
        .list(user.id, filter.status.as_deref())
        .await?;
    Ok(Json(MappingListRes {
        count: mappings.len(),
        mappings: to_res(&mappings),
    }))
}

#[utoipa::path(
    post,
    path = "/mappings/",
    tag = "mappings",
    security(("bearer" = [])),
    request_body = MappingCreateReq,
    responses(
        (status = 201, description = "Mapping created", body = MappingEnvelope),
        (status = 400, description = "Field-keyed or non-field validation errors")
    )
)]
/// Assign a doctor to one of the caller's patients.
#[axum::debug_handler]
pub async fn create_mapping(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<MappingCreateReq>,
) -> ApiResult<(StatusCode, Json<MappingEnvelope>)> {
    let mapping = state.mappings.create(user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(MappingEnvelope {
            message: "Patient-Doctor mapping created successfully".into(),
            mapping: mapping.to_res(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/mappings/{patient_id}/",
    tag = "mappings",
    security(("bearer" = [])),
    params(
        ("patient_id" = i64, Path, description = "Patient id"),
        StatusFilter
    ),
    responses(
        (status = 200, description = "Doctors assigned to the patient", body = PatientMappingsRes),
        (status = 404, description = "No such patient owned by the caller")
    )
)]
#[axum::debug_handler]
pub async fn list_patient_mappings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(patient_id): AppPath<i64>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Json<PatientMappingsRes>> {
    let (patient, mappings) = state
        .mappings
        .list_for_patient(user.id, patient_id, filter.status.as_deref())
        .await?;
    Ok(Json(PatientMappingsRes {
        patient: patient.full_name(),
        count: mappings.len(),
        doctors: to_res(&mappings),
    }))
}

#[utoipa::path(
    put,
    path = "/mappings/detail/{id}/",
    tag = "mappings",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Mapping id")),
    request_body = MappingUpdateReq,
    responses(
        (status = 200, description = "Mapping updated", body = MappingEnvelope),
        (status = 400, description = "Validation errors"),
        (status = 404, description = "No such mapping created by the caller")
    )
)]
/// Change the status and/or notes of a mapping.
#[axum::debug_handler]
pub async fn update_mapping(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<MappingUpdateReq>,
) -> ApiResult<Json<MappingEnvelope>> {
    let mapping = state.mappings.update(user.id, id, req).await?;
    Ok(Json(MappingEnvelope {
        message: "Mapping updated successfully".into(),
        mapping: mapping.to_res(),
    }))
}

#[utoipa::path(
    delete,
    path = "/mappings/detail/{id}/",
    tag = "mappings",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Mapping id")),
    responses(
        (status = 204, description = "Mapping removed", body = MessageRes),
        (status = 404, description = "No such mapping created by the caller")
    )
)]
#[axum::debug_handler]
pub async fn delete_mapping(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<(StatusCode, Json<MessageRes>)> {
    let mapping = state.mappings.delete(user.id, id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        Json(MessageRes {
            message: format!(
                "Removed {} from patient {}",
                mapping.doctor.full_name(),
                mapping.patient.full_name()
            ),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/mappings/status-choices/",
    tag = "mappings",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Every mapping status with its label", body = StatusChoicesRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list_status_choices(AuthUser(_user): AuthUser) -> Json<StatusChoicesRes> {
    Json(StatusChoicesRes {
        status_choices: MappingService::status_choices(),
    })
}
