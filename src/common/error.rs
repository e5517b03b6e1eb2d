use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::crm_gateway::CrmError;

// Nosso tipo de erro interno, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Sem acesso ao módulo '{0}'")]
    ModuleAccessDenied(String),

    #[error("Fora do escopo do usuário: {0}")]
    OutOfScope(String),

    #[error("{0} não encontrado")]
    NotFound(String),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Falha em uma operação de escrita no CRM (leituras degradam antes de chegar aqui)
    #[error("Falha no CRM: {0}")]
    Crm(#[from] CrmError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

/// O formato de erro que sai na fronteira HTTP:
/// `{ "status": "ERROR", "messageCode": "...", "message": "..." }`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message_code: Option<&'static str>,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_code: Option<&'static str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message_code: Some(message_code),
            message: message.into(),
            details: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "ACCESS_DENIED", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }
}

impl AppError {
    /// Converte o erro interno no formato da fronteira.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            AppError::ValidationError(_) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Um ou mais campos são inválidos.",
            ),
            AppError::InvalidToken => {
                ApiError::unauthorized("Token de autenticação inválido ou ausente.")
            }
            AppError::UserNotFound => ApiError::unauthorized("Usuário não encontrado."),
            AppError::ModuleAccessDenied(module) => ApiError::forbidden(format!(
                "Você não tem acesso ao módulo '{}'.",
                module
            )),
            AppError::OutOfScope(what) => {
                ApiError::forbidden(format!("Você não tem acesso a este registro ({}).", what))
            }
            AppError::NotFound(what) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} não encontrado.", what),
            ),
            AppError::BadRequest(msg) => {
                ApiError::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            AppError::Crm(CrmError::NotFound { .. }) => ApiError::new(
                StatusCode::NOT_FOUND,
                "CRM_RECORD_NOT_FOUND",
                "Registro não encontrado no CRM.",
            ),
            AppError::Crm(CrmError::InvalidId(id)) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                format!("Id do CRM inválido: '{}'.", id),
            ),
            AppError::Crm(e) => {
                tracing::error!("Falha no CRM: {}", e);
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    "CRM_ERROR",
                    "Não foi possível concluir a operação no CRM.",
                )
            }
            // Todos os outros erros (DatabaseError, JwtError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada, o cliente recebe uma genérica.
            e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Ocorreu um erro inesperado.",
                )
            }
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        // Erros de validação carregam os detalhes por campo
        if let AppError::ValidationError(errors) = &err {
            let mut api = err.to_api_error();
            let details: std::collections::HashMap<String, Vec<String>> = errors
                .field_errors()
                .into_iter()
                .map(|(field, field_errors)| {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    (field.to_string(), messages)
                })
                .collect();
            api.details = serde_json::to_value(details).ok();
            return api;
        }
        err.to_api_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            status: "ERROR",
            message_code: self.message_code,
            message: &self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
