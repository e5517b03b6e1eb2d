// src/handlers/applications.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        response::ApiResponse,
    },
    config::AppState,
    middleware::module_access::{ApplicationModule, RequireModule},
    models::policy::{CreditLimitCheckPayload, EndorsementCheck},
};

// POST /api/applications/credit-limit-check
#[utoipa::path(
    post,
    path = "/api/applications/credit-limit-check",
    tag = "Applications",
    request_body = CreditLimitCheckPayload,
    responses(
        (status = 200, description = "Se o limite pedido passa da alçada da apólice vigente", body = EndorsementCheck),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Cliente fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn check_credit_limit(
    State(app_state): State<AppState>,
    guard: RequireModule<ApplicationModule>,
    Json(payload): Json<CreditLimitCheckPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let check = app_state.credit_limit_service.check(&guard.actor, &payload).await?;
    Ok((StatusCode::OK, ApiResponse::success(check)))
}
