// src/handlers/claims.rs

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        response::ApiResponse,
    },
    config::AppState,
    middleware::module_access::{ClaimModule, RequireModule},
    models::crm::{CreateClaimPayload, CrmClaim},
    services::crm_gateway::DocumentUpload,
};

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClaimListQuery {
    pub client_id: Option<Uuid>,
    pub search: Option<String>,

    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 1_000_000, message = "invalid_page"))]
    pub page: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "invalid_limit"))]
    pub limit: i64,
}

/// Metadados do upload; o arquivo vem cru no corpo.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DocumentMetadata {
    #[validate(length(min = 1, max = 255, message = "invalid_file_name"))]
    pub file_name: String,

    #[validate(length(max = 2000, message = "too_long"))]
    pub description: Option<String>,
}

// GET /api/claims
#[utoipa::path(
    get,
    path = "/api/claims",
    tag = "Claims",
    params(ClaimListQuery),
    responses(
        (status = 200, description = "Sinistros do CRM no escopo do usuário (página vazia se o CRM estiver fora)")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_claims(
    State(app_state): State<AppState>,
    guard: RequireModule<ClaimModule>,
    Query(query): Query<ClaimListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(AppError::ValidationError)?;

    let page = app_state
        .claim_service
        .list_claims(&guard.actor, query.client_id, query.search.as_deref(), query.page, query.limit)
        .await?;

    Ok((StatusCode::OK, ApiResponse::success(page)))
}

// POST /api/claims
#[utoipa::path(
    post,
    path = "/api/claims",
    tag = "Claims",
    request_body = CreateClaimPayload,
    responses(
        (status = 201, description = "Sinistro criado no CRM", body = CrmClaim),
        (status = 403, description = "Cliente fora do escopo"),
        (status = 502, description = "Falha no CRM")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_claim(
    State(app_state): State<AppState>,
    guard: RequireModule<ClaimModule>,
    Json(payload): Json<CreateClaimPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let claim = app_state.claim_service.create_claim(&guard.actor, &payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(claim)))
}

// POST /api/claims/{crmClaimId}/documents
#[utoipa::path(
    post,
    path = "/api/claims/{crmClaimId}/documents",
    tag = "Claims",
    params(
        ("crmClaimId" = String, Path, description = "ID do sinistro no CRM"),
        DocumentMetadata
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Documento anexado ao sinistro"),
        (status = 404, description = "Sinistro inexistente"),
        (status = 502, description = "Falha no CRM")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_claim_document(
    State(app_state): State<AppState>,
    guard: RequireModule<ClaimModule>,
    Path(crm_claim_id): Path<String>,
    Query(metadata): Query<DocumentMetadata>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    metadata.validate().map_err(AppError::ValidationError)?;
    if body.is_empty() {
        return Err(AppError::BadRequest("arquivo vazio".into()).into());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let upload = DocumentUpload {
        file_name: metadata.file_name,
        content_type,
        bytes: body.to_vec(),
        description: metadata.description,
    };

    let document = app_state
        .claim_service
        .upload_document(&guard.actor, &crm_claim_id, upload)
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::success(document)))
}
