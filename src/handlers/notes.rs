// src/handlers/notes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::{error::ApiError, response::ApiResponse},
    config::AppState,
    middleware::module_access::{NoteModule, RequireModule},
    models::note::Note,
};

// GET /api/notes/{entityType}/{entityId}
#[utoipa::path(
    get,
    path = "/api/notes/{entityType}/{entityId}",
    tag = "Notes",
    params(
        ("entityType" = String, Path, description = "Módulo da entidade (ex: debtor)"),
        ("entityId" = Uuid, Path, description = "ID da entidade")
    ),
    responses(
        (status = 200, description = "Notas visíveis ao usuário, mais recentes primeiro", body = Vec<Note>),
        (status = 400, description = "Tipo de entidade desconhecido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_notes(
    State(app_state): State<AppState>,
    guard: RequireModule<NoteModule>,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let notes = app_state
        .note_service
        .list_for_entity(&guard.actor, &entity_type, entity_id)
        .await?;

    Ok((StatusCode::OK, ApiResponse::success(notes)))
}
