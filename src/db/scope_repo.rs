// src/db/scope_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, services::scope_resolver::OwnershipLookup};

// Consultas de posse usadas pelo resolvedor de escopo
#[derive(Clone)]
pub struct ScopeRepository {
    pool: PgPool,
}

impl ScopeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnershipLookup for ScopeRepository {
    async fn client_ids_owned_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM clients
            WHERE is_deleted = false
              AND (risk_analyst_id = $1 OR service_manager_id = $1)
            ORDER BY name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn active_debtor_ids_for_clients(&self, client_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if client_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT debtor_id FROM client_debtors
            WHERE is_active = true AND client_id = ANY($1)
            "#,
        )
        .bind(client_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn insurer_ids_for_clients(&self, client_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if client_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT insurer_id FROM policies
            WHERE is_deleted = false
              AND insurer_id IS NOT NULL
              AND client_id = ANY($1)
            "#,
        )
        .bind(client_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn crm_ids_for_clients(&self, client_ids: &[Uuid]) -> Result<Vec<String>, AppError> {
        if client_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT crm_client_id FROM clients
            WHERE crm_client_id IS NOT NULL AND id = ANY($1)
            "#,
        )
        .bind(client_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
