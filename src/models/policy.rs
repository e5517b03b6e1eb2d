// src/models/policy.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::text::contains_ignore_case;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub client_id: Uuid,
    pub insurer_id: Option<Uuid>,
    pub crm_policy_id: Option<String>,
    pub policy_number: Option<String>,
    /// Texto livre vindo do CRM (ex: "Credit Insurance - SME")
    pub product: String,
    pub discretionary_limit: Option<Decimal>,
    pub inception_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subtipo da apólice, derivado do texto de `product`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyKind {
    CreditInsurance,
    RiskManagementPackage,
    Other,
}

impl PolicyKind {
    pub fn from_product(product: &str) -> Self {
        if contains_ignore_case(product, "Credit Insurance") {
            PolicyKind::CreditInsurance
        } else if contains_ignore_case(product, "Risk Management Package") {
            PolicyKind::RiskManagementPackage
        } else {
            PolicyKind::Other
        }
    }
}

impl Policy {
    pub fn kind(&self) -> PolicyKind {
        PolicyKind::from_product(&self.product)
    }

    /// Vigente quando `inception_date <= date < expiry_date`.
    /// Sem vencimento a apólice é em aberto; sem início, nunca está vigente.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        let Some(inception) = self.inception_date else {
            return false;
        };
        inception <= date && self.expiry_date.is_none_or(|expiry| date < expiry)
    }
}

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

/// Pedido de verificação: o limite pedido passa da alçada da apólice?
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditLimitCheckPayload {
    pub client_id: Uuid,

    #[validate(custom(function = "positive_amount"))]
    pub credit_limit: Decimal,

    /// Data de referência; sem ela, hoje.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndorsementCheck {
    pub is_endorsed_limit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discretionary_limit: Option<Decimal>,
}
