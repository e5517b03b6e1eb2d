// src/handlers/search.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        response::ApiResponse,
    },
    config::AppState,
    middleware::auth::CurrentActor,
    models::search::{ResultEnvelope, SearchTarget},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GlobalSearchQuery {
    /// Texto livre; vazio devolve lista vazia
    #[serde(default)]
    pub search: String,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EntitySearchQuery {
    pub search: Option<String>,

    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 1_000_000, message = "invalid_page"))]
    pub page: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "invalid_limit"))]
    pub limit: i64,
}

// GET /api/search
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "Search",
    params(GlobalSearchQuery),
    responses(
        (status = 200, description = "Resultados de todos os módulos visíveis, na ordem dos módulos", body = Vec<ResultEnvelope>),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn global_search(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<GlobalSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let results = app_state.search_service.global_search(&actor, &query.search).await;
    Ok((StatusCode::OK, ApiResponse::success(results)))
}

// GET /api/search/{entityType}
#[utoipa::path(
    get,
    path = "/api/search/{entityType}",
    tag = "Search",
    params(
        ("entityType" = String, Path, description = "user, client, insurer, debtor, debtor-director, task, application"),
        EntitySearchQuery
    ),
    responses(
        (status = 200, description = "Campos de identificação dos registros, ou listagem paginada sem texto"),
        (status = 400, description = "Tipo de entidade desconhecido")
    ),
    security(("api_jwt" = []))
)]
pub async fn entity_search(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(entity_type): Path<String>,
    Query(query): Query<EntitySearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(AppError::ValidationError)?;
    let target: SearchTarget = entity_type.parse().map_err(AppError::BadRequest)?;

    let result = app_state
        .search_service
        .entity_search(&actor, target, query.search.as_deref(), query.page, query.limit)
        .await?;

    Ok((StatusCode::OK, ApiResponse::success(result)))
}
