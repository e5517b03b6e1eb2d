// src/handlers/maintenance.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    common::{error::ApiError, response::ApiResponse},
    config::AppState,
    middleware::module_access::{RequireModule, SettingsModule},
    models::audit::RemediationReport,
};

// POST /api/maintenance/credit-limits/dedupe
#[utoipa::path(
    post,
    path = "/api/maintenance/credit-limits/dedupe",
    tag = "Maintenance",
    responses(
        (status = 200, description = "Vínculos duplicados desativados (idempotente)", body = RemediationReport),
        (status = 403, description = "Exige full-access em settings")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_redundant_credit_limits(
    State(app_state): State<AppState>,
    guard: RequireModule<SettingsModule>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .remediation_service
        .remove_redundant_credit_limits(&guard.actor)
        .await?;

    Ok((StatusCode::OK, ApiResponse::success(report)))
}

// POST /api/maintenance/credit-limits/active-applications
#[utoipa::path(
    post,
    path = "/api/maintenance/credit-limits/active-applications",
    tag = "Maintenance",
    responses(
        (status = 200, description = "Aplicação ativa recalculada para cada vínculo (idempotente)", body = RemediationReport),
        (status = 403, description = "Exige full-access em settings")
    ),
    security(("api_jwt" = []))
)]
pub async fn recompute_active_applications(
    State(app_state): State<AppState>,
    guard: RequireModule<SettingsModule>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .remediation_service
        .recompute_active_applications(&guard.actor)
        .await?;

    Ok((StatusCode::OK, ApiResponse::success(report)))
}
