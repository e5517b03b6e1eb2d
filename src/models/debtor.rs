// src/models/debtor.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Perfil global (deduplicado) da empresa devedora
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Debtor {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub entity_name: String,
    pub entity_type: Option<String>,
    pub abn: Option<String>,
    pub acn: Option<String>,
    pub registration_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Vínculo por tenant: é aqui que mora o limite de crédito
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientDebtor {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub client_id: Uuid,
    pub debtor_id: Uuid,
    pub credit_limit: Decimal,
    pub is_endorsed_limit: bool,
    pub limit_type: Option<String>,
    pub is_active: bool,
    pub active_application_id: Option<Uuid>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Valor de `limit_type` que marca um RES check.
pub const LIMIT_TYPE_RES_CHECK: &str = "RES_CHECK";

// Sócio/diretor ("stakeholder") de um devedor: pessoa física ou jurídica
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebtorDirector {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub debtor_id: Uuid,
    /// "individual" ou "company"
    pub kind: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub entity_name: Option<String>,
    pub abn: Option<String>,
    pub acn: Option<String>,
    pub registration_number: Option<String>,
}

impl DebtorDirector {
    pub fn is_individual(&self) -> bool {
        self.kind.eq_ignore_ascii_case("individual")
    }

    /// Nome de exibição: nome completo para pessoa física, razão social para empresa.
    pub fn display_name(&self) -> String {
        if self.is_individual() {
            [&self.first_name, &self.middle_name, &self.last_name]
                .into_iter()
                .filter_map(|p| p.as_deref())
                .filter(|p| !p.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            self.entity_name.clone().unwrap_or_default()
        }
    }
}
