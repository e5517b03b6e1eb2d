// src/handlers/dashboard.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::{error::ApiError, pagination::DateRange, response::ApiResponse},
    config::AppState,
    middleware::module_access::{DashboardModule, RequireModule},
    models::dashboard::DashboardOverview,
    services::dashboard_service::DashboardMetric,
};

/// Janela opcional sobre `updatedAt`, fechada nas duas pontas.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DashboardWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DashboardWindow {
    fn range(&self) -> DateRange {
        DateRange::from_dates(self.start_date, self.end_date)
    }
}

// GET /api/dashboard/{clientId}
#[utoipa::path(
    get,
    path = "/api/dashboard/{clientId}",
    tag = "Dashboard",
    params(
        ("clientId" = Uuid, Path, description = "ID do cliente"),
        DashboardWindow
    ),
    responses(
        (status = 200, description = "Todas as métricas do painel do cliente", body = DashboardOverview),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Cliente fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_overview(
    State(app_state): State<AppState>,
    guard: RequireModule<DashboardModule>,
    Path(client_id): Path<Uuid>,
    Query(window): Query<DashboardWindow>,
) -> Result<impl IntoResponse, ApiError> {
    let overview = app_state
        .dashboard_service
        .overview(&guard.actor, client_id, window.range())
        .await?;

    Ok((StatusCode::OK, ApiResponse::success(overview)))
}

// GET /api/dashboard/{clientId}/{metric}
#[utoipa::path(
    get,
    path = "/api/dashboard/{clientId}/{metric}",
    tag = "Dashboard",
    params(
        ("clientId" = Uuid, Path, description = "ID do cliente"),
        ("metric" = String, Path, description = "endorsed-limits, res-checks, application-status, approved-amount, decisions"),
        DashboardWindow
    ),
    responses(
        (status = 200, description = "Valor da métrica (contagens e somas nunca nulas)"),
        (status = 400, description = "Métrica desconhecida"),
        (status = 403, description = "Cliente fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_metric(
    State(app_state): State<AppState>,
    guard: RequireModule<DashboardModule>,
    Path((client_id, metric)): Path<(Uuid, String)>,
    Query(window): Query<DashboardWindow>,
) -> Result<impl IntoResponse, ApiError> {
    let metric: DashboardMetric = metric.parse()?;
    let value = app_state
        .dashboard_service
        .metric(&guard.actor, client_id, window.range(), metric)
        .await?;

    Ok((StatusCode::OK, ApiResponse::success(value)))
}
