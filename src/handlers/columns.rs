// src/handlers/columns.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        response::ApiResponse,
    },
    config::AppState,
    middleware::auth::CurrentActor,
    models::{
        access::ModuleName,
        columns::{ColumnsResponse, UpdateColumnsPayload},
    },
};

fn parse_module(raw: &str) -> Result<ModuleName, AppError> {
    raw.parse().map_err(AppError::BadRequest)
}

// GET /api/columns/{module}
#[utoipa::path(
    get,
    path = "/api/columns/{module}",
    tag = "Columns",
    params(("module" = String, Path, description = "Nome do módulo (ex: client)")),
    responses(
        (status = 200, description = "Colunas padrão e customizadas, marcadas com isChecked", body = ColumnsResponse),
        (status = 404, description = "Módulo sem catálogo de colunas")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_columns(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(module): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let columns = app_state.column_service.get_columns(&actor, parse_module(&module)?)?;
    Ok((StatusCode::OK, ApiResponse::success(columns)))
}

// PUT /api/columns/{module}
#[utoipa::path(
    put,
    path = "/api/columns/{module}",
    tag = "Columns",
    params(("module" = String, Path, description = "Nome do módulo (ex: client)")),
    request_body = UpdateColumnsPayload,
    responses(
        (status = 200, description = "Preferência salva", body = ColumnsResponse),
        (status = 400, description = "Coluna fora do catálogo")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_columns(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(module): Path<String>,
    Json(payload): Json<UpdateColumnsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let columns = app_state
        .column_service
        .update_columns(&actor, parse_module(&module)?, &payload)
        .await?;

    Ok((StatusCode::OK, ApiResponse::success(columns)))
}
