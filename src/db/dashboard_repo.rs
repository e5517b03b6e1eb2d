// src/db/dashboard_repo.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::DateRange},
    models::{
        application::ApplicationStatus,
        dashboard::{ApprovedAmountRow, CountOfTotalRow, DecisionCountsRow},
        debtor::LIMIT_TYPE_RES_CHECK,
    },
    services::dashboard_service::DashboardStore,
};

#[derive(Debug, FromRow)]
struct StatusCountRow {
    status: ApplicationStatus,
    count: i64,
}

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Todas as consultas: um cliente, janela fechada em `updated_at` ($2/$3 nulos = sem limite)

#[async_trait]
impl DashboardStore for DashboardRepository {
    // 1. Limites endossados x total de vínculos ativos
    async fn endorsed_limit_counts(&self, client_id: Uuid, range: DateRange) -> Result<CountOfTotalRow, AppError> {
        let row = sqlx::query_as::<_, CountOfTotalRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE cd.is_endorsed_limit) AS count,
                COUNT(*) AS total
            FROM client_debtors cd
            WHERE cd.client_id = $1
              AND cd.is_active = true
              AND ($2::timestamptz IS NULL OR cd.updated_at >= $2)
              AND ($3::timestamptz IS NULL OR cd.updated_at < $3)
            "#,
        )
        .bind(client_id)
        .bind(range.start)
        .bind(range.end_before)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    // 2. RES checks x total de vínculos ativos
    async fn res_check_counts(&self, client_id: Uuid, range: DateRange) -> Result<CountOfTotalRow, AppError> {
        let row = sqlx::query_as::<_, CountOfTotalRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE cd.limit_type = $4) AS count,
                COUNT(*) AS total
            FROM client_debtors cd
            WHERE cd.client_id = $1
              AND cd.is_active = true
              AND ($2::timestamptz IS NULL OR cd.updated_at >= $2)
              AND ($3::timestamptz IS NULL OR cd.updated_at < $3)
            "#,
        )
        .bind(client_id)
        .bind(range.start)
        .bind(range.end_before)
        .bind(LIMIT_TYPE_RES_CHECK)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    // 3. Histograma de status (o serviço completa os status sem linhas)
    async fn status_counts(
        &self,
        client_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<(ApplicationStatus, i64)>, AppError> {
        let rows = sqlx::query_as::<_, StatusCountRow>(
            r#"
            SELECT a.status, COUNT(*) AS count
            FROM applications a
            WHERE a.client_id = $1
              AND a.is_deleted = false
              AND ($2::timestamptz IS NULL OR a.updated_at >= $2)
              AND ($3::timestamptz IS NULL OR a.updated_at < $3)
            GROUP BY a.status
            "#,
        )
        .bind(client_id)
        .bind(range.start)
        .bind(range.end_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.status, r.count)).collect())
    }

    // 4. Valor pedido x valor aprovado, só para aplicações aprovadas
    async fn approved_amounts(&self, client_id: Uuid, range: DateRange) -> Result<ApprovedAmountRow, AppError> {
        let row = sqlx::query_as::<_, ApprovedAmountRow>(
            r#"
            SELECT
                SUM(a.credit_limit) AS total,
                SUM(cd.credit_limit) AS approved_amount
            FROM applications a
            LEFT JOIN client_debtors cd ON cd.id = a.client_debtor_id
            WHERE a.client_id = $1
              AND a.is_deleted = false
              AND a.status = 'APPROVED'
              AND ($2::timestamptz IS NULL OR a.updated_at >= $2)
              AND ($3::timestamptz IS NULL OR a.updated_at < $3)
            "#,
        )
        .bind(client_id)
        .bind(range.start)
        .bind(range.end_before)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    // 5. Decisões; "parcialmente aprovada" = aprovada com limite endossado
    async fn decision_counts(&self, client_id: Uuid, range: DateRange) -> Result<DecisionCountsRow, AppError> {
        let row = sqlx::query_as::<_, DecisionCountsRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE a.status = 'APPROVED' AND NOT a.is_endorsed_limit) AS approved,
                COUNT(*) FILTER (WHERE a.status = 'APPROVED' AND a.is_endorsed_limit) AS partially_approved,
                COUNT(*) FILTER (WHERE a.status = 'DECLINED') AS declined,
                COUNT(*) FILTER (WHERE a.status = 'CANCELLED') AS cancelled,
                COUNT(*) FILTER (WHERE a.status = 'WITHDRAWN') AS withdrawn
            FROM applications a
            WHERE a.client_id = $1
              AND a.is_deleted = false
              AND ($2::timestamptz IS NULL OR a.updated_at >= $2)
              AND ($3::timestamptz IS NULL OR a.updated_at < $3)
            "#,
        )
        .bind(client_id)
        .bind(range.start)
        .bind(range.end_before)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
