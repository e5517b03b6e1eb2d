// src/models/dashboard.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::application::ApplicationStatus;

// 1. Contagem "parte do todo" (limites endossados, RES checks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CountOfTotal {
    pub count: i64,
    pub total: i64,
}

// 2. Histograma de status das aplicações (todos os status aparecem, com 0 quando não há linhas)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistogram {
    pub statuses: BTreeMap<String, i64>,
    pub total: i64,
}

impl StatusHistogram {
    pub fn from_counts(counts: &[(ApplicationStatus, i64)]) -> Self {
        let mut statuses: BTreeMap<String, i64> = ApplicationStatus::ALL
            .into_iter()
            .map(|s| (status_key(s), 0))
            .collect();
        for (status, count) in counts {
            *statuses.entry(status_key(*status)).or_insert(0) += count;
        }
        let total = statuses.values().sum();
        Self { statuses, total }
    }

    pub fn count(&self, status: ApplicationStatus) -> i64 {
        self.statuses.get(&status_key(status)).copied().unwrap_or(0)
    }
}

fn status_key(status: ApplicationStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

// 3. Valor pedido (na aplicação) x valor aprovado (no ClientDebtor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedAmount {
    pub total: Decimal,
    pub approved_amount: Decimal,
}

// 4. Aprovadas / parcialmente aprovadas / recusadas / canceladas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct DecisionBreakdown {
    /// APPROVED sem limite endossado
    pub approved: i64,
    /// APPROVED com `is_endorsed_limit = true`
    pub partially_approved: i64,
    pub declined: i64,
    pub cancelled: i64,
    pub withdrawn: i64,
}

/// Linha crua da agregação de decisões, antes de zerar os nulos.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct DecisionCountsRow {
    pub approved: Option<i64>,
    pub partially_approved: Option<i64>,
    pub declined: Option<i64>,
    pub cancelled: Option<i64>,
    pub withdrawn: Option<i64>,
}

/// Linha crua de "parte do todo".
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct CountOfTotalRow {
    pub count: Option<i64>,
    pub total: Option<i64>,
}

/// Linha crua da soma de valores.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct ApprovedAmountRow {
    pub total: Option<Decimal>,
    pub approved_amount: Option<Decimal>,
}

/// Todas as métricas do painel de um cliente de uma vez.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub endorsed_limits: CountOfTotal,
    pub res_checks: CountOfTotal,
    pub application_status: StatusHistogram,
    pub approved_amount: ApprovedAmount,
    pub decisions: DecisionBreakdown,
}
