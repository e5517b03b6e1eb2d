// src/common/response.rs

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::columns::ColumnHeader;

/// Envelope de sucesso: `{ "status": "SUCCESS", "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "SUCCESS",
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Resposta das listagens: `{ docs, headers, total, page, limit, pages }`
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T: Serialize> {
    pub docs: Vec<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ColumnHeader>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(docs: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            docs,
            headers: Vec::new(),
            total,
            page,
            limit,
            pages,
        }
    }

    pub fn empty(page: i64, limit: i64) -> Self {
        Self::new(Vec::new(), 0, page, limit)
    }

    pub fn with_headers(mut self, headers: Vec<ColumnHeader>) -> Self {
        self.headers = headers;
        self
    }
}
