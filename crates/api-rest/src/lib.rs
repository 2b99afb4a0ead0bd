//! # API REST
//!
//! REST API for the clinic records system.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer token authentication (`extract::AuthUser`)
//! - Mapping core and auth failures onto status codes (`error::ApiError`)
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for wire types and tokens, and `clinic-core` for data operations.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod handlers;

#[cfg(test)]
mod tests;

use api_shared::{AuthConfig, TokenService};
use axum::routing::{get, post, put};
use axum::Router;
use clinic_core::{DoctorService, MappingService, PatientService, SqlitePool, UserService};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use handlers::{auth, doctors, health, mappings, patients};

/// Application state shared across REST API handlers.
///
/// Every service wraps the same connection pool; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub patients: PatientService,
    pub doctors: DoctorService,
    pub mappings: MappingService,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(pool: SqlitePool, auth: AuthConfig) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            patients: PatientService::new(pool.clone()),
            doctors: DoctorService::new(pool.clone()),
            mappings: MappingService::new(pool),
            tokens: TokenService::new(Arc::new(auth)),
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register,
        auth::login,
        auth::refresh,
        patients::list_patients,
        patients::create_patient,
        patients::get_patient,
        patients::update_patient,
        patients::delete_patient,
        doctors::list_doctors,
        doctors::create_doctor,
        doctors::get_doctor,
        doctors::update_doctor,
        doctors::delete_doctor,
        doctors::list_specializations,
        mappings::list_mappings,
        mappings::create_mapping,
        mappings::list_patient_mappings,
        mappings::update_mapping,
        mappings::delete_mapping,
        mappings::list_status_choices,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::MessageRes,
        api_shared::RegisterReq,
        api_shared::LoginReq,
        api_shared::RefreshReq,
        api_shared::UserRes,
        api_shared::TokensRes,
        api_shared::AuthRes,
        api_shared::RefreshRes,
        api_shared::PatientReq,
        api_shared::PatientRes,
        api_shared::PatientEnvelope,
        api_shared::PatientListRes,
        api_shared::DoctorReq,
        api_shared::DoctorRes,
        api_shared::DoctorSummaryRes,
        api_shared::DoctorEnvelope,
        api_shared::DoctorListRes,
        api_shared::SpecializationsRes,
        api_shared::MappingCreateReq,
        api_shared::MappingUpdateReq,
        api_shared::MappingRes,
        api_shared::MappingEnvelope,
        api_shared::MappingListRes,
        api_shared::PatientMappingsRes,
        api_shared::StatusChoicesRes,
        clinic_types::Choice,
        clinic_types::Gender,
        clinic_types::Specialization,
        clinic_types::MappingStatus,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "patients", description = "Patients owned by the caller"),
        (name = "doctors", description = "Shared doctor directory"),
        (name = "mappings", description = "Patient/doctor assignments"),
    )
)]
pub struct ApiDoc;

/// Build the full REST application.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/token/refresh/", post(auth::refresh))
        .route(
            "/patients/",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patients/:id/",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route(
            "/doctors/",
            get(doctors::list_doctors).post(doctors::create_doctor),
        )
        .route(
            "/doctors/specializations/",
            get(doctors::list_specializations),
        )
        .route(
            "/doctors/:id/",
            get(doctors::get_doctor)
                .put(doctors::update_doctor)
                .delete(doctors::delete_doctor),
        )
        .route(
            "/mappings/",
            get(mappings::list_mappings).post(mappings::create_mapping),
        )
        .route(
            "/mappings/status-choices/",
            get(mappings::list_status_choices),
        )
        .route(
            "/mappings/detail/:id/",
            put(mappings::update_mapping).delete(mappings::delete_mapping),
        )
        .route(
            "/mappings/:patient_id/",
            get(mappings::list_patient_mappings),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the REST API on `addr` until Ctrl-C.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("++ Clinic REST API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Clinic REST API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
