// src/db/client_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::ListQuery, text::contains_pattern},
    models::{
        client::{Client, CrmNamedRef, NamedRef},
        crm::{ClientSyncSummary, CrmContact},
    },
    services::{
        claim_service::ClaimLookup,
        client_service::{ClientSnapshot, ClientStore},
        housekeeping::CounterStore,
        scope_resolver::ScopePredicate,
    },
};

/// Colunas ordenáveis da listagem (nome no catálogo -> coluna).
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("name") => "c.name",
        Some("abn") => "c.abn",
        Some("acn") => "c.acn",
        Some("crmClientId") => "c.crm_client_id",
        Some("createdAt") => "c.created_at",
        _ => "c.updated_at",
    }
}

fn contact_name(contact: &CrmContact) -> String {
    let name = contact.full_name();
    if !name.is_empty() {
        return name;
    }
    contact.email.clone().unwrap_or_else(|| contact.id.clone())
}

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, scope: &ScopePredicate, query: &ListQuery) {
        qb.push(" FROM clients c WHERE c.is_deleted = false AND ");
        scope.push_sql(qb, "c");

        if let Some(term) = query.search_term() {
            let pattern = contains_pattern(term);
            qb.push(" AND (c.name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR c.abn ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR c.acn ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        let range = query.date_range();
        if let Some(start) = range.start {
            qb.push(" AND c.updated_at >= ");
            qb.push_bind(start);
        }
        if let Some(end) = range.end_before {
            qb.push(" AND c.updated_at < ");
            qb.push_bind(end);
        }
    }

    async fn names(&self, table: &'static str, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, NamedRef>(&format!(
            "SELECT id, name FROM {} WHERE id = ANY($1)",
            table
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.id, r.name)).collect())
    }
}

#[async_trait]
impl ClientStore for ClientRepository {
    async fn list(&self, scope: &ScopePredicate, query: &ListQuery) -> Result<(Vec<Client>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        Self::push_filters(&mut count, scope, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT c.*");
        Self::push_filters(&mut qb, scope, query);
        qb.push(format!(
            " ORDER BY {} {}, c.id ASC LIMIT ",
            sort_column(query.sort_by.as_deref()),
            query.sort_order.as_sql()
        ));
        qb.push_bind(query.limit);
        qb.push(" OFFSET ");
        qb.push_bind(query.offset());

        let clients = qb.build_query_as::<Client>().fetch_all(&self.pool).await?;
        Ok((clients, total))
    }

    async fn user_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
        self.names("users", ids).await
    }

    async fn insurer_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
        self.names("insurers", ids).await
    }

    async fn sync_from_crm(&self, snapshot: &ClientSnapshot) -> Result<ClientSyncSummary, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Cliente (responsáveis só são trocados quando informados)
        let client_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO clients (name, crm_client_id, abn, acn, risk_analyst_id, service_manager_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (crm_client_id) DO UPDATE SET
                name = EXCLUDED.name,
                abn = EXCLUDED.abn,
                acn = EXCLUDED.acn,
                risk_analyst_id = COALESCE(EXCLUDED.risk_analyst_id, clients.risk_analyst_id),
                service_manager_id = COALESCE(EXCLUDED.service_manager_id, clients.service_manager_id),
                is_deleted = false,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(&snapshot.account.name)
        .bind(&snapshot.account.id)
        .bind(&snapshot.account.abn)
        .bind(&snapshot.account.acn)
        .bind(snapshot.risk_analyst_id)
        .bind(snapshot.service_manager_id)
        .fetch_one(&mut *tx)
        .await?;

        // 2. Contatos -> usuários do cliente
        for contact in &snapshot.contacts {
            sqlx::query(
                r#"
                INSERT INTO client_users (client_id, name, email, crm_contact_id, has_portal_access)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (crm_contact_id) DO UPDATE SET
                    client_id = EXCLUDED.client_id,
                    name = EXCLUDED.name,
                    email = EXCLUDED.email,
                    has_portal_access = EXCLUDED.has_portal_access,
                    is_deleted = false,
                    updated_at = NOW()
                "#,
            )
            .bind(client_id)
            .bind(contact_name(contact))
            .bind(&contact.email)
            .bind(&contact.id)
            .bind(contact.has_portal_access)
            .execute(&mut *tx)
            .await?;
        }

        // 3. Apólices; a seguradora é resolvida pelo id do CRM
        for policy in &snapshot.policies {
            sqlx::query(
                r#"
                INSERT INTO policies (
                    client_id, insurer_id, crm_policy_id, policy_number, product,
                    discretionary_limit, inception_date, expiry_date
                )
                VALUES (
                    $1, (SELECT id FROM insurers WHERE crm_insurer_id = $2), $3, $4, $5, $6, $7, $8
                )
                ON CONFLICT (crm_policy_id) DO UPDATE SET
                    client_id = EXCLUDED.client_id,
                    insurer_id = EXCLUDED.insurer_id,
                    policy_number = EXCLUDED.policy_number,
                    product = EXCLUDED.product,
                    discretionary_limit = EXCLUDED.discretionary_limit,
                    inception_date = EXCLUDED.inception_date,
                    expiry_date = EXCLUDED.expiry_date,
                    is_deleted = false,
                    updated_at = NOW()
                "#,
            )
            .bind(client_id)
            .bind(&policy.insurer_id)
            .bind(&policy.id)
            .bind(&policy.policy_number)
            .bind(&policy.product)
            .bind(policy.discretionary_limit)
            .bind(policy.inception_date)
            .bind(policy.expiry_date)
            .execute(&mut *tx)
            .await?;
        }

        // 4. Seguradora do cliente = a da apólice mais recente
        sqlx::query(
            r#"
            UPDATE clients SET insurer_id = COALESCE((
                SELECT p.insurer_id FROM policies p
                WHERE p.client_id = $1 AND p.insurer_id IS NOT NULL AND p.is_deleted = false
                ORDER BY p.inception_date DESC NULLS LAST
                LIMIT 1
            ), insurer_id)
            WHERE id = $1
            "#,
        )
        .bind(client_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ClientSyncSummary {
            client_id,
            contacts_synced: snapshot.contacts.len(),
            policies_synced: snapshot.policies.len(),
        })
    }
}

#[async_trait]
impl ClaimLookup for ClientRepository {
    async fn crm_id_for_client(&self, client_id: Uuid) -> Result<Option<String>, AppError> {
        let crm_id = sqlx::query_scalar::<_, Option<String>>(
            "SELECT crm_client_id FROM clients WHERE id = $1 AND is_deleted = false",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(crm_id.flatten())
    }

    async fn client_names_by_crm_ids(&self, crm_ids: &[String]) -> Result<HashMap<String, String>, AppError> {
        if crm_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, CrmNamedRef>(
            "SELECT crm_client_id, name FROM clients WHERE crm_client_id = ANY($1)",
        )
        .bind(crm_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.crm_client_id, r.name)).collect())
    }
}

#[async_trait]
impl CounterStore for ClientRepository {
    async fn reset_daily_request_counts(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE clients SET daily_request_count = 0 WHERE daily_request_count > 0",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
