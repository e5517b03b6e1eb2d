// src/handlers/users.rs

use axum::{http::StatusCode, response::IntoResponse};

use crate::{
    common::{error::ApiError, response::ApiResponse},
    middleware::auth::CurrentActor,
    models::access::ModuleAccessView,
    services::access_policy,
};

// GET /api/users/me/modules
#[utoipa::path(
    get,
    path = "/api/users/me/modules",
    tag = "Users",
    responses(
        (status = 200, description = "Módulos com os tipos de acesso e o nível do usuário", body = Vec<ModuleAccessView>),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn my_modules(CurrentActor(actor): CurrentActor) -> Result<impl IntoResponse, ApiError> {
    Ok((StatusCode::OK, ApiResponse::success(access_policy::module_views(&actor))))
}
