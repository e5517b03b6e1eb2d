// src/models/crm.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Registros como chegam do CRM ---
// `#[serde(default)]` em tudo que é opcional: o CRM pode omitir campos.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrmAccount {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abn: Option<String>,
    #[serde(default)]
    pub acn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmContact {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub has_portal_access: bool,
}

impl CrmContact {
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.last_name]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmPolicy {
    pub id: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub discretionary_limit: Option<Decimal>,
    #[serde(default)]
    pub inception_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub insurer_id: Option<String>,
}

/// Sinistro no CRM. Não é persistido localmente; `accountid` é o `crm_client_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrmClaim {
    pub id: String,
    pub accountid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub claim_amount: Option<Decimal>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub notified_date: Option<NaiveDate>,
}

/// Sinistro + nome do cliente resolvido localmente.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimView {
    #[serde(flatten)]
    pub claim: CrmClaim,
    pub client_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClaimPayload {
    pub client_id: Uuid,

    #[validate(length(min = 1, message = "required"))]
    pub name: String,

    pub claim_amount: Option<Decimal>,

    pub notified_date: Option<NaiveDate>,

    #[validate(length(max = 2000, message = "too_long"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddClientFromCrmPayload {
    pub risk_analyst_id: Option<Uuid>,
    pub service_manager_id: Option<Uuid>,
}

/// Resumo do "adicionar cliente do CRM".
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientSyncSummary {
    pub client_id: Uuid,
    pub contacts_synced: usize,
    pub policies_synced: usize,
}
