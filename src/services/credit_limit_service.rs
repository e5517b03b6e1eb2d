// src/services/credit_limit_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        access::ModuleName,
        auth::Actor,
        policy::{CreditLimitCheckPayload, EndorsementCheck, Policy, PolicyKind},
    },
    services::{access_policy, scope_resolver::ScopeResolver},
};

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn policies_for_client(&self, client_id: Uuid) -> Result<Vec<Policy>, AppError>;
}

/// Regra do limite endossado: entre as apólices de Seguro de Crédito vigentes
/// em `date`, vale a de início mais recente. O limite é endossado quando o
/// valor pedido passa da alçada (`discretionary_limit`) dela.
/// Sem apólice vigente (ou sem alçada cadastrada) nunca é endossado.
pub fn endorsement(policies: &[Policy], credit_limit: Decimal, date: NaiveDate) -> EndorsementCheck {
    let policy = policies
        .iter()
        .filter(|p| p.kind() == PolicyKind::CreditInsurance && p.is_active_on(date))
        .max_by_key(|p| p.inception_date);

    match policy {
        Some(policy) => EndorsementCheck {
            is_endorsed_limit: policy
                .discretionary_limit
                .is_some_and(|limit| credit_limit > limit),
            policy_id: Some(policy.id),
            discretionary_limit: policy.discretionary_limit,
        },
        None => EndorsementCheck {
            is_endorsed_limit: false,
            policy_id: None,
            discretionary_limit: None,
        },
    }
}

#[derive(Clone)]
pub struct CreditLimitService {
    policies: Arc<dyn PolicyStore>,
    resolver: ScopeResolver,
}

impl CreditLimitService {
    pub fn new(policies: Arc<dyn PolicyStore>, resolver: ScopeResolver) -> Self {
        Self { policies, resolver }
    }

    pub async fn check(
        &self,
        actor: &Actor,
        payload: &CreditLimitCheckPayload,
    ) -> Result<EndorsementCheck, AppError> {
        let access = access_policy::resolve_access(actor, ModuleName::Application);
        self.resolver
            .ensure_client_visible(actor, access, payload.client_id)
            .await?;

        let date = payload.date.unwrap_or_else(|| Utc::now().date_naive());
        let policies = self.policies.policies_for_client(payload.client_id).await?;
        Ok(endorsement(&policies, payload.credit_limit, date))
    }
}
