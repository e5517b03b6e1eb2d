// src/db/policy_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::policy::Policy,
    services::credit_limit_service::PolicyStore,
};

#[derive(Clone)]
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyStore for PolicyRepository {
    // A classificação por produto e a vigência ficam com o serviço
    async fn policies_for_client(&self, client_id: Uuid) -> Result<Vec<Policy>, AppError> {
        let policies = sqlx::query_as::<_, Policy>(
            r#"
            SELECT * FROM policies
            WHERE client_id = $1 AND is_deleted = false
            ORDER BY inception_date DESC NULLS LAST
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(policies)
    }
}
