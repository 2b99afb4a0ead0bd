//! `/doctors/` endpoints.
//!
//! Reads cover every active doctor; writes are limited to the doctor's creator.

use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, AuthUser};
use crate::AppState;
use api_shared::{
    DoctorEnvelope, DoctorFilters, DoctorListRes, DoctorReq, DoctorRes, DoctorSummaryRes,
    MessageRes, SpecializationsRes,
};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinic_core::DoctorService;

#[utoipa::path(
    get,
    path = "/doctors/",
    tag = "doctors",
    security(("bearer" = [])),
    params(DoctorFilters),
    responses(
        (status = 200, description = "Active doctors", body = DoctorListRes),
        (status = 401, description = "Not authenticated")
    )
)]
#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(filters): Query<DoctorFilters>,
) -> ApiResult<Json<DoctorListRes>> {
    let doctors: Vec<DoctorSummaryRes> = state
        .doctors
        .list(&filters)
        .await?
        .iter()
        .map(|d| d.to_summary())
        .collect();
    Ok(Json(DoctorListRes {
        count: doctors.len(),
        doctors,
    }))
}

#[utoipa::path(
    post,
    path = "/doctors/",
    tag = "doctors",
    security(("bearer" = [])),
    request_body = DoctorReq,
    responses(
        (status = 201, description = "Doctor created", body = DoctorEnvelope),
        (status = 400, description = "Field-keyed validation errors")
    )
)]
#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<DoctorReq>,
) -> ApiResult<(StatusCode, Json<DoctorEnvelope>)> {
    let doctor = state.doctors.create(user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(DoctorEnvelope {
            message: "Doctor created successfully".into(),
            doctor: doctor.to_res(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/doctors/{id}/",
    tag = "doctors",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "The doctor", body = DoctorRes),
        (status = 404, description = "No such active doctor")
    )
)]
#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<DoctorRes>> {
    let doctor = state.doctors.get(id).await?;
    Ok(Json(doctor.to_res()))
}

#[utoipa::path(
    put,
    path = "/doctors/{id}/",
    tag = "doctors",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Doctor id")),
    request_body = DoctorReq,
    responses(
        (status = 200, description = "Doctor updated", body = DoctorEnvelope),
        (status = 400, description = "Field-keyed validation errors"),
        (status = 404, description = "No such doctor created by the caller")
    )
)]
/// Partial update by the creator, who may also reactivate or deactivate the doctor.
#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<DoctorReq>,
) -> ApiResult<Json<DoctorEnvelope>> {
    let doctor = state.doctors.update(user.id, id, req).await?;
    Ok(Json(DoctorEnvelope {
        message: "Doctor updated successfully".into(),
        doctor: doctor.to_res(),
    }))
}

#[utoipa::path(
    delete,
    path = "/doctors/{id}/",
    tag = "doctors",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Doctor id")),
    responses(
        (status = 204, description = "Doctor and its mappings deleted", body = MessageRes),
        (status = 404, description = "No such doctor created by the caller")
    )
)]
#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<(StatusCode, Json<MessageRes>)> {
    let doctor = state.doctors.delete(user.id, id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        Json(MessageRes {
            message: format!("Doctor {} deleted successfully", doctor.full_name()),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/doctors/specializations/",
    tag = "doctors",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Every specialization with its label", body = SpecializationsRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list_specializations(AuthUser(_user): AuthUser) -> Json<SpecializationsRes> {
    Json(SpecializationsRes {
        specializations: DoctorService::specializations(),
    })
}
