// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::ListQuery,
        response::ApiResponse,
    },
    config::AppState,
    middleware::module_access::{ClientModule, RequireModule},
    models::crm::{AddClientFromCrmPayload, ClientSyncSummary, CrmAccount},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CrmSearchQuery {
    #[serde(default)]
    pub search: String,
}

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    params(ListQuery),
    responses(
        (status = 200, description = "Página de clientes visíveis, projetada nas colunas do usuário"),
        (status = 403, description = "Sem acesso ao módulo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    guard: RequireModule<ClientModule>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(AppError::ValidationError)?;

    let page = app_state.client_service.list_clients(&guard.actor, &query).await?;
    Ok((StatusCode::OK, ApiResponse::success(page)))
}

// GET /api/clients/crm
#[utoipa::path(
    get,
    path = "/api/clients/crm",
    tag = "Clients",
    params(CrmSearchQuery),
    responses(
        (status = 200, description = "Contas do CRM (vazio se o CRM estiver fora)", body = Vec<CrmAccount>)
    ),
    security(("api_jwt" = []))
)]
pub async fn search_crm_clients(
    State(app_state): State<AppState>,
    guard: RequireModule<ClientModule>,
    Query(query): Query<CrmSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = app_state.client_service.search_crm(&guard.actor, &query.search).await;
    Ok((StatusCode::OK, ApiResponse::success(accounts)))
}

// POST /api/clients/crm/{crmClientId}
#[utoipa::path(
    post,
    path = "/api/clients/crm/{crmClientId}",
    tag = "Clients",
    params(("crmClientId" = String, Path, description = "ID da conta no CRM")),
    request_body = AddClientFromCrmPayload,
    responses(
        (status = 201, description = "Cliente, contatos e apólices sincronizados", body = ClientSyncSummary),
        (status = 404, description = "Conta inexistente no CRM"),
        (status = 502, description = "Falha no CRM")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_client_from_crm(
    State(app_state): State<AppState>,
    guard: RequireModule<ClientModule>,
    Path(crm_client_id): Path<String>,
    Json(payload): Json<AddClientFromCrmPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let summary = app_state
        .client_service
        .add_from_crm(&guard.actor, &crm_client_id, &payload)
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::success(summary)))
}
