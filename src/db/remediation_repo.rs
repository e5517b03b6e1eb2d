// src/db/remediation_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::audit::AuditEntry,
    services::remediation_service::{
        ActiveApplicationFix, ApplicationDecision, CreditLimitLink, LiveCreditLimit, RemediationStore,
    },
};

#[derive(Clone)]
pub struct RemediationRepository {
    pool: PgPool,
}

impl RemediationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava a entrada de auditoria no executor dado (normalmente a transação da correção).
    async fn record_audit<'e, E>(executor: E, audit: &AuditEntry) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (entity_type, action, user_id, changes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(audit.entity_type)
        .bind(audit.action)
        .bind(audit.user_id)
        .bind(Json(&audit.changes))
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RemediationStore for RemediationRepository {
    async fn live_credit_limits(&self) -> Result<Vec<LiveCreditLimit>, AppError> {
        let rows = sqlx::query_as::<_, LiveCreditLimit>(
            r#"
            SELECT
                cd.id, cd.client_id, cd.debtor_id, cd.active_application_id,
                a.approval_or_declining_date AS active_application_decided_at,
                cd.updated_at
            FROM client_debtors cd
            LEFT JOIN applications a ON a.id = cd.active_application_id
            WHERE cd.is_active = true
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn credit_limit_links(&self) -> Result<Vec<CreditLimitLink>, AppError> {
        let rows = sqlx::query_as::<_, CreditLimitLink>(
            r#"
            SELECT id, client_id, debtor_id, active_application_id
            FROM client_debtors
            WHERE is_active = true
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn resolved_applications(&self) -> Result<Vec<ApplicationDecision>, AppError> {
        let rows = sqlx::query_as::<_, ApplicationDecision>(
            r#"
            SELECT id, client_id, debtor_id, status, approval_or_declining_date, updated_at
            FROM applications
            WHERE is_deleted = false
              AND status IN ('APPROVED', 'DECLINED', 'WITHDRAWN', 'CANCELLED')
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn deactivate_credit_limits(&self, ids: &[Uuid], audit: &AuditEntry) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE client_debtors
            SET is_active = false, updated_at = NOW()
            WHERE id = ANY($1) AND is_active = true
            "#,
        )
        .bind(ids)
        .execute(&mut *tx)
        .await?;

        Self::record_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn set_active_applications(
        &self,
        fixes: &[ActiveApplicationFix],
        audit: &AuditEntry,
    ) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut changed = 0;
        for fix in fixes {
            let result = sqlx::query(
                r#"
                UPDATE client_debtors
                SET active_application_id = $2, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(fix.client_debtor_id)
            .bind(fix.after)
            .execute(&mut *tx)
            .await?;
            changed += result.rows_affected();
        }

        Self::record_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(changed)
    }
}
