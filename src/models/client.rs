// src/models/client.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Client (O "Tenant")
// ---
// Conta principal do painel de risco. Nasce de um registro do CRM.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub crm_client_id: Option<String>,
    pub abn: Option<String>,
    pub acn: Option<String>,

    // Atribuição de responsáveis (dono da carteira)
    pub risk_analyst_id: Option<Uuid>,
    pub service_manager_id: Option<Uuid>,

    pub insurer_id: Option<Uuid>,

    // Contador zerado diariamente pela rotina de housekeeping
    pub daily_request_count: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Par (id, nome) usado para trocar ids de referência pelo nome de exibição.
#[derive(Debug, Clone, FromRow)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

/// Par (id do CRM, nome) usado para montar a visão de sinistros.
#[derive(Debug, Clone, FromRow)]
pub struct CrmNamedRef {
    pub crm_client_id: String,
    pub name: String,
}
