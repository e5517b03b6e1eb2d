// src/services/claim_service.rs
//
// Sinistros vivem só no CRM. Leituras degradam para vazio quando o CRM falha;
// escritas propagam o erro.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::page_offset, response::Paginated},
    models::{
        access::{AccessLevel, ModuleName},
        auth::Actor,
        crm::{ClaimView, CreateClaimPayload, CrmClaim},
    },
    services::{
        access_policy,
        crm_gateway::{decode_record, decode_records, CrmEntityType, CrmError, CrmGateway, DocumentUpload},
        scope_resolver::{ScopeCandidate, ScopePredicate, ScopeResolver},
    },
};

/// Consultas locais que a visão de sinistros precisa.
#[async_trait]
pub trait ClaimLookup: Send + Sync {
    async fn crm_id_for_client(&self, client_id: Uuid) -> Result<Option<String>, AppError>;

    /// `crm_client_id -> nome do cliente`
    async fn client_names_by_crm_ids(&self, crm_ids: &[String]) -> Result<HashMap<String, String>, AppError>;
}

#[derive(Clone)]
pub struct ClaimService {
    lookup: Arc<dyn ClaimLookup>,
    crm: Arc<dyn CrmGateway>,
    resolver: ScopeResolver,
}

impl ClaimService {
    pub fn new(lookup: Arc<dyn ClaimLookup>, crm: Arc<dyn CrmGateway>, resolver: ScopeResolver) -> Self {
        Self { lookup, crm, resolver }
    }

    pub async fn list_claims(
        &self,
        actor: &Actor,
        client_id: Option<Uuid>,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Paginated<ClaimView>, AppError> {
        let access = access_policy::resolve_access(actor, ModuleName::Claim);
        if access == AccessLevel::None {
            return Ok(Paginated::empty(page, limit));
        }

        let fetched = match client_id {
            Some(client_id) => self.claims_of_client(actor, access, client_id, page, limit).await?,
            None => self.claims_in_scope(actor, access, search, page, limit).await?,
        };
        let Some((claims, total)) = fetched else {
            return Ok(Paginated::empty(page, limit));
        };

        let mut crm_ids: Vec<String> = claims.iter().map(|c| c.accountid.clone()).collect();
        crm_ids.sort();
        crm_ids.dedup();
        let names = self.lookup.client_names_by_crm_ids(&crm_ids).await?;

        let docs = claims
            .into_iter()
            .map(|claim| ClaimView {
                client_name: names.get(&claim.accountid).cloned().unwrap_or_default(),
                claim,
            })
            .collect();
        Ok(Paginated::new(docs, total, page, limit))
    }

    /// Sinistros filhos da conta do cliente (paginação do próprio CRM).
    async fn claims_of_client(
        &self,
        actor: &Actor,
        access: AccessLevel,
        client_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Option<(Vec<CrmClaim>, i64)>, AppError> {
        self.resolver.ensure_client_visible(actor, access, client_id).await?;
        let Some(crm_id) = self.lookup.crm_id_for_client(client_id).await? else {
            return Ok(None);
        };

        let outcome = async {
            let batch = self
                .crm
                .list_child_records(CrmEntityType::Claim, &crm_id, page, limit)
                .await?;
            let claims: Vec<CrmClaim> = decode_records(CrmEntityType::Claim.path(), batch.list)?;
            Ok::<_, CrmError>((claims, batch.total_count))
        }
        .await;

        Ok(absorb(outcome))
    }

    /// Sem cliente explícito: busca no CRM e filtra pelo escopo via `accountid`.
    async fn claims_in_scope(
        &self,
        actor: &Actor,
        access: AccessLevel,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Option<(Vec<CrmClaim>, i64)>, AppError> {
        let scope = self
            .resolver
            .module_scope(actor, ModuleName::Claim, access, None)
            .await?;
        if matches!(&scope, ScopePredicate::CrmAccountIn(ids) if ids.is_empty()) {
            return Ok(None);
        }

        let keyword = search.map(str::trim).unwrap_or_default();
        let outcome = async {
            let records = self.crm.search_entities(CrmEntityType::Claim, keyword).await?;
            decode_records::<CrmClaim>(CrmEntityType::Claim.path(), records)
        }
        .await;
        let Some(claims) = absorb(outcome) else {
            return Ok(None);
        };

        let visible: Vec<CrmClaim> = claims
            .into_iter()
            .filter(|claim| {
                scope.admits(&ScopeCandidate {
                    crm_account_id: Some(claim.accountid.clone()),
                    ..Default::default()
                })
            })
            .collect();
        let total = visible.len() as i64;
        let offset = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or_default();
        let docs = visible.into_iter().skip(offset).take(take).collect();
        Ok(Some((docs, total)))
    }

    pub async fn create_claim(&self, actor: &Actor, payload: &CreateClaimPayload) -> Result<CrmClaim, AppError> {
        if !access_policy::can_write(actor, ModuleName::Claim) {
            return Err(AppError::ModuleAccessDenied(ModuleName::Claim.to_string()));
        }
        let access = access_policy::resolve_access(actor, ModuleName::Claim);
        self.resolver
            .ensure_client_visible(actor, access, payload.client_id)
            .await?;

        let crm_id = self
            .lookup
            .crm_id_for_client(payload.client_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("cliente sem vínculo com o CRM".into()))?;

        let fields = json!({
            "accountid": crm_id,
            "name": payload.name,
            "claimAmount": payload.claim_amount,
            "notifiedDate": payload.notified_date,
            "description": payload.description,
        });
        let record = self.crm.create_record(CrmEntityType::Claim, &fields).await?;
        let claim: CrmClaim = decode_record(CrmEntityType::Claim.path(), record)?;

        tracing::info!("✅ Sinistro {} criado no CRM para a conta {}", claim.id, claim.accountid);
        Ok(claim)
    }

    pub async fn upload_document(
        &self,
        actor: &Actor,
        crm_claim_id: &str,
        upload: DocumentUpload,
    ) -> Result<serde_json::Value, AppError> {
        if !access_policy::can_write(actor, ModuleName::Claim) {
            return Err(AppError::ModuleAccessDenied(ModuleName::Claim.to_string()));
        }

        let record = self
            .crm
            .fetch_entity(CrmEntityType::Claim, crm_claim_id)
            .await?
            .ok_or_else(|| CrmError::NotFound {
                entity: CrmEntityType::Claim.path(),
                crm_id: crm_claim_id.to_string(),
            })?;
        let claim: CrmClaim = decode_record(CrmEntityType::Claim.path(), record)?;

        let access = access_policy::resolve_access(actor, ModuleName::Claim);
        let scope = self
            .resolver
            .module_scope(actor, ModuleName::Claim, access, None)
            .await?;
        let candidate = ScopeCandidate {
            crm_account_id: Some(claim.accountid.clone()),
            ..Default::default()
        };
        if !scope.admits(&candidate) {
            return Err(AppError::OutOfScope("sinistro".into()));
        }

        let uploaded = self
            .crm
            .upload_document(crm_claim_id, CrmEntityType::Claim, upload)
            .await?;
        tracing::info!("📎 Documento anexado ao sinistro {}", crm_claim_id);
        Ok(uploaded)
    }
}

/// Leitura do CRM: falha vira "nada", com log.
fn absorb<T>(outcome: Result<T, CrmError>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("⚠️ CRM indisponível na leitura de sinistros: {}", e);
            None
        }
    }
}
