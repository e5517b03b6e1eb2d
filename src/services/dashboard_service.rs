// src/services/dashboard_service.rs

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::DateRange},
    models::{
        access::ModuleName,
        application::ApplicationStatus,
        auth::Actor,
        dashboard::{
            ApprovedAmount, ApprovedAmountRow, CountOfTotal, CountOfTotalRow, DashboardOverview,
            DecisionBreakdown, DecisionCountsRow, StatusHistogram,
        },
    },
    services::{access_policy, scope_resolver::ScopeResolver},
};

/// Consultas agregadas cruas, já restritas a um cliente e à janela de `updated_at`.
/// Os nulos (sem linhas) são normalizados pelo serviço.
#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// Vínculos ativos com limite endossado x total de vínculos ativos.
    async fn endorsed_limit_counts(&self, client_id: Uuid, range: DateRange) -> Result<CountOfTotalRow, AppError>;

    /// Vínculos ativos do tipo RES check x total de vínculos ativos.
    async fn res_check_counts(&self, client_id: Uuid, range: DateRange) -> Result<CountOfTotalRow, AppError>;

    async fn status_counts(
        &self,
        client_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<(ApplicationStatus, i64)>, AppError>;

    async fn approved_amounts(&self, client_id: Uuid, range: DateRange) -> Result<ApprovedAmountRow, AppError>;

    async fn decision_counts(&self, client_id: Uuid, range: DateRange) -> Result<DecisionCountsRow, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardMetric {
    EndorsedLimits,
    ResChecks,
    ApplicationStatus,
    ApprovedAmount,
    Decisions,
}

impl FromStr for DashboardMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "endorsed-limits" => Ok(DashboardMetric::EndorsedLimits),
            "res-checks" => Ok(DashboardMetric::ResChecks),
            "application-status" => Ok(DashboardMetric::ApplicationStatus),
            "approved-amount" => Ok(DashboardMetric::ApprovedAmount),
            "decisions" => Ok(DashboardMetric::Decisions),
            other => Err(AppError::BadRequest(format!("métrica desconhecida: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(CountOfTotal),
    Histogram(StatusHistogram),
    Amount(ApprovedAmount),
    Decisions(DecisionBreakdown),
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn DashboardStore>,
    resolver: ScopeResolver,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DashboardStore>, resolver: ScopeResolver) -> Self {
        Self { store, resolver }
    }

    /// O painel é sempre de um cliente; o cliente precisa estar no escopo do ator.
    async fn ensure_client_in_scope(&self, actor: &Actor, client_id: Uuid) -> Result<(), AppError> {
        let access = access_policy::resolve_access(actor, ModuleName::Dashboard);
        self.resolver.ensure_client_visible(actor, access, client_id).await
    }

    pub async fn metric(
        &self,
        actor: &Actor,
        client_id: Uuid,
        range: DateRange,
        metric: DashboardMetric,
    ) -> Result<MetricValue, AppError> {
        self.ensure_client_in_scope(actor, client_id).await?;

        Ok(match metric {
            DashboardMetric::EndorsedLimits => {
                MetricValue::Count(count_of_total(self.store.endorsed_limit_counts(client_id, range).await?))
            }
            DashboardMetric::ResChecks => {
                MetricValue::Count(count_of_total(self.store.res_check_counts(client_id, range).await?))
            }
            DashboardMetric::ApplicationStatus => MetricValue::Histogram(StatusHistogram::from_counts(
                &self.store.status_counts(client_id, range).await?,
            )),
            DashboardMetric::ApprovedAmount => {
                MetricValue::Amount(approved_amount(self.store.approved_amounts(client_id, range).await?))
            }
            DashboardMetric::Decisions => {
                MetricValue::Decisions(decisions(self.store.decision_counts(client_id, range).await?))
            }
        })
    }

    /// As cinco métricas em paralelo.
    pub async fn overview(
        &self,
        actor: &Actor,
        client_id: Uuid,
        range: DateRange,
    ) -> Result<DashboardOverview, AppError> {
        self.ensure_client_in_scope(actor, client_id).await?;

        let (endorsed, res, statuses, amounts, decision_row) = tokio::try_join!(
            self.store.endorsed_limit_counts(client_id, range),
            self.store.res_check_counts(client_id, range),
            self.store.status_counts(client_id, range),
            self.store.approved_amounts(client_id, range),
            self.store.decision_counts(client_id, range),
        )?;

        Ok(DashboardOverview {
            endorsed_limits: count_of_total(endorsed),
            res_checks: count_of_total(res),
            application_status: StatusHistogram::from_counts(&statuses),
            approved_amount: approved_amount(amounts),
            decisions: decisions(decision_row),
        })
    }
}

// Normalização: nenhuma métrica sai nula
fn count_of_total(row: CountOfTotalRow) -> CountOfTotal {
    CountOfTotal {
        count: row.count.unwrap_or(0),
        total: row.total.unwrap_or(0),
    }
}

fn approved_amount(row: ApprovedAmountRow) -> ApprovedAmount {
    ApprovedAmount {
        total: row.total.unwrap_or(Decimal::ZERO),
        approved_amount: row.approved_amount.unwrap_or(Decimal::ZERO),
    }
}

fn decisions(row: DecisionCountsRow) -> DecisionBreakdown {
    DecisionBreakdown {
        approved: row.approved.unwrap_or(0),
        partially_approved: row.partially_approved.unwrap_or(0),
        declined: row.declined.unwrap_or(0),
        cancelled: row.cancelled.unwrap_or(0),
        withdrawn: row.withdrawn.unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::access::AccessType,
        services::{
            access_policy::test_support::{client_user, user_with},
            scope_resolver::test_support::FakeOwnership,
        },
    };

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    /// Uma aplicação em memória, já no formato que as agregações olham.
    #[derive(Clone)]
    struct AppRow {
        client_id: Uuid,
        status: ApplicationStatus,
        is_endorsed: bool,
        requested: Decimal,
        approved: Decimal,
        updated_at: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Default)]
    struct InMemoryDashboard {
        apps: Vec<AppRow>,
    }

    impl InMemoryDashboard {
        fn rows(&self, client_id: Uuid, range: DateRange) -> impl Iterator<Item = &AppRow> {
            self.apps
                .iter()
                .filter(move |a| a.client_id == client_id && range.contains(a.updated_at))
        }
    }

    #[async_trait]
    impl DashboardStore for InMemoryDashboard {
        async fn endorsed_limit_counts(&self, _: Uuid, _: DateRange) -> Result<CountOfTotalRow, AppError> {
            // Sem vínculos: o banco devolve nulos
            Ok(CountOfTotalRow::default())
        }

        async fn res_check_counts(&self, _: Uuid, _: DateRange) -> Result<CountOfTotalRow, AppError> {
            Ok(CountOfTotalRow {
                count: Some(0),
                total: None,
            })
        }

        async fn status_counts(
            &self,
            client_id: Uuid,
            range: DateRange,
        ) -> Result<Vec<(ApplicationStatus, i64)>, AppError> {
            Ok(self.rows(client_id, range).map(|a| (a.status, 1)).collect())
        }

        async fn approved_amounts(&self, client_id: Uuid, range: DateRange) -> Result<ApprovedAmountRow, AppError> {
            let approved: Vec<&AppRow> = self
                .rows(client_id, range)
                .filter(|a| a.status == ApplicationStatus::Approved)
                .collect();
            if approved.is_empty() {
                return Ok(ApprovedAmountRow::default());
            }
            Ok(ApprovedAmountRow {
                total: Some(approved.iter().map(|a| a.requested).sum()),
                approved_amount: Some(approved.iter().map(|a| a.approved).sum()),
            })
        }

        async fn decision_counts(&self, client_id: Uuid, range: DateRange) -> Result<DecisionCountsRow, AppError> {
            let count = |pred: &dyn Fn(&AppRow) -> bool| Some(self.rows(client_id, range).filter(|a| pred(a)).count() as i64);
            Ok(DecisionCountsRow {
                approved: count(&|a| a.status == ApplicationStatus::Approved && !a.is_endorsed),
                partially_approved: count(&|a| a.status == ApplicationStatus::Approved && a.is_endorsed),
                declined: count(&|a| a.status == ApplicationStatus::Declined),
                cancelled: count(&|a| a.status == ApplicationStatus::Cancelled),
                withdrawn: count(&|a| a.status == ApplicationStatus::Withdrawn),
            })
        }
    }

    fn service(store: InMemoryDashboard, ownership: FakeOwnership) -> DashboardService {
        DashboardService::new(Arc::new(store), ScopeResolver::new(Arc::new(ownership)))
    }

    fn at(y: i32, m: u32, d: u32) -> chrono::DateTime<chrono::Utc> {
        chrono::NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[tokio::test]
    async fn empty_client_reports_zeros_not_nulls() {
        let client_id = Uuid::new_v4();
        let actor = user_with(Uuid::new_v4(), &[("dashboard", &[AccessType::FullAccess])]);
        let svc = service(InMemoryDashboard::default(), FakeOwnership::default());

        let overview = svc.overview(&actor, client_id, DateRange::default()).await.unwrap();

        assert_eq!(overview.endorsed_limits, CountOfTotal { count: 0, total: 0 });
        assert_eq!(overview.res_checks, CountOfTotal { count: 0, total: 0 });
        assert_eq!(overview.approved_amount, ApprovedAmount::default());
        assert_eq!(overview.decisions, DecisionBreakdown::default());
        assert_eq!(overview.application_status.total, 0);

        let json = serde_json::to_value(&overview.approved_amount).unwrap();
        assert_eq!(json, serde_json::json!({"total": 0.0, "approvedAmount": 0.0}));
    }

    #[tokio::test]
    async fn partially_approved_is_separate_from_approved() {
        let client_id = Uuid::new_v4();
        let row = |status, is_endorsed| AppRow {
            client_id,
            status,
            is_endorsed,
            requested: dec(100),
            approved: dec(80),
            updated_at: at(2024, 3, 10),
        };
        let store = InMemoryDashboard {
            apps: vec![
                row(ApplicationStatus::Approved, false),
                row(ApplicationStatus::Approved, true),
                row(ApplicationStatus::Approved, true),
                row(ApplicationStatus::Declined, false),
            ],
        };
        let actor = user_with(Uuid::new_v4(), &[("dashboard", &[AccessType::FullAccess])]);
        let svc = service(store, FakeOwnership::default());

        let value = svc
            .metric(&actor, client_id, DateRange::default(), DashboardMetric::Decisions)
            .await
            .unwrap();
        let MetricValue::Decisions(breakdown) = value else {
            panic!("métrica errada");
        };
        assert_eq!(breakdown.approved, 1);
        assert_eq!(breakdown.partially_approved, 2);
        assert_eq!(breakdown.declined, 1);

        let value = svc
            .metric(&actor, client_id, DateRange::default(), DashboardMetric::ApprovedAmount)
            .await
            .unwrap();
        assert_eq!(
            value,
            MetricValue::Amount(ApprovedAmount {
                total: dec(300),
                approved_amount: dec(240),
            })
        );
    }

    #[tokio::test]
    async fn window_is_inclusive_on_updated_at() {
        let client_id = Uuid::new_v4();
        let row = |updated_at| AppRow {
            client_id,
            status: ApplicationStatus::Submitted,
            is_endorsed: false,
            requested: Decimal::ZERO,
            approved: Decimal::ZERO,
            updated_at,
        };
        let store = InMemoryDashboard {
            apps: vec![row(at(2024, 1, 1)), row(at(2024, 1, 31)), row(at(2024, 2, 1))],
        };
        let actor = user_with(Uuid::new_v4(), &[("dashboard", &[AccessType::FullAccess])]);
        let range = DateRange::from_dates(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 31),
        );

        let value = service(store, FakeOwnership::default())
            .metric(&actor, client_id, range, DashboardMetric::ApplicationStatus)
            .await
            .unwrap();
        let MetricValue::Histogram(histogram) = value else {
            panic!("métrica errada");
        };
        assert_eq!(histogram.count(ApplicationStatus::Submitted), 2);
    }

    #[tokio::test]
    async fn foreign_client_is_out_of_scope() {
        let (own, other) = (Uuid::new_v4(), Uuid::new_v4());
        let analyst = Uuid::new_v4();
        let svc = service(InMemoryDashboard::default(), FakeOwnership::default().own(analyst, own));

        let actor = user_with(analyst, &[("dashboard", &[AccessType::Read])]);
        assert!(svc.overview(&actor, own, DateRange::default()).await.is_ok());
        assert!(matches!(
            svc.overview(&actor, other, DateRange::default()).await,
            Err(AppError::OutOfScope(_))
        ));

        let portal = client_user(Uuid::new_v4(), own);
        assert!(matches!(
            svc.overview(&portal, other, DateRange::default()).await,
            Err(AppError::OutOfScope(_))
        ));
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("res-checks".parse::<DashboardMetric>().ok(), Some(DashboardMetric::ResChecks));
        assert!("revenue".parse::<DashboardMetric>().is_err());
    }
}
