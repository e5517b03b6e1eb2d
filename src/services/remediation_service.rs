// src/services/remediation_service.rs
//
// Rotinas de correção de dados dos limites de crédito. O planejamento é puro
// (testável sem banco); a aplicação do plano e a trilha de auditoria ficam
// numa única transação no repositório. Rodar de novo não muda nada.

use std::{cmp::Reverse, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        access::{AccessLevel, ModuleName},
        application::ApplicationStatus,
        audit::{AuditChange, AuditEntry, RemediationReport},
        auth::Actor,
    },
    services::access_policy,
};

pub const ACTION_DEDUPE: &str = "remove-redundant-credit-limits";
pub const ACTION_ACTIVE_APPLICATION: &str = "recompute-active-application";
const ENTITY_CLIENT_DEBTOR: &str = "client-debtor";

/// Vínculo ativo + data de decisão da aplicação ativa dele.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LiveCreditLimit {
    pub id: Uuid,
    pub client_id: Uuid,
    pub debtor_id: Uuid,
    pub active_application_id: Option<Uuid>,
    pub active_application_decided_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CreditLimitLink {
    pub id: Uuid,
    pub client_id: Uuid,
    pub debtor_id: Uuid,
    pub active_application_id: Option<Uuid>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationDecision {
    pub id: Uuid,
    pub client_id: Uuid,
    pub debtor_id: Uuid,
    pub status: ApplicationStatus,
    pub approval_or_declining_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupAction {
    pub keep: Uuid,
    pub deactivate: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveApplicationFix {
    pub client_debtor_id: Uuid,
    pub before: Option<Uuid>,
    pub after: Uuid,
}

/// Por par (cliente, devedor) com mais de um vínculo vivo: mantém o de aplicação
/// ativa mais recente (depois o atualizado por último) e desativa o resto.
pub fn plan_dedup(rows: &[LiveCreditLimit]) -> Vec<DedupAction> {
    let mut groups: HashMap<(Uuid, Uuid), Vec<&LiveCreditLimit>> = HashMap::new();
    for row in rows {
        groups.entry((row.client_id, row.debtor_id)).or_default().push(row);
    }

    let mut actions: Vec<DedupAction> = groups
        .into_values()
        .filter(|group| group.len() > 1)
        .map(|mut group| {
            // `None` ordena antes de `Some`, então o Reverse joga sem-data para o fim
            group.sort_by_key(|r| (Reverse(r.active_application_decided_at), Reverse(r.updated_at), r.id));
            let mut deactivate: Vec<Uuid> = group[1..].iter().map(|r| r.id).collect();
            deactivate.sort();
            DedupAction {
                keep: group[0].id,
                deactivate,
            }
        })
        .collect();
    actions.sort_by_key(|a| a.keep);
    actions
}

/// A aplicação ativa de cada vínculo é a resolvida com decisão mais recente do par.
/// Pares sem aplicação resolvida ficam como estão.
pub fn plan_active_application(
    links: &[CreditLimitLink],
    applications: &[ApplicationDecision],
) -> Vec<ActiveApplicationFix> {
    let mut latest: HashMap<(Uuid, Uuid), &ApplicationDecision> = HashMap::new();
    for app in applications.iter().filter(|a| a.status.is_resolved()) {
        let key = (app.client_id, app.debtor_id);
        let newer = latest.get(&key).is_none_or(|current| {
            (app.approval_or_declining_date, app.updated_at)
                > (current.approval_or_declining_date, current.updated_at)
        });
        if newer {
            latest.insert(key, app);
        }
    }

    links
        .iter()
        .filter_map(|link| {
            let app = latest.get(&(link.client_id, link.debtor_id))?;
            (link.active_application_id != Some(app.id)).then(|| ActiveApplicationFix {
                client_debtor_id: link.id,
                before: link.active_application_id,
                after: app.id,
            })
        })
        .collect()
}

#[async_trait]
pub trait RemediationStore: Send + Sync {
    async fn live_credit_limits(&self) -> Result<Vec<LiveCreditLimit>, AppError>;

    async fn credit_limit_links(&self) -> Result<Vec<CreditLimitLink>, AppError>;

    async fn resolved_applications(&self) -> Result<Vec<ApplicationDecision>, AppError>;

    /// Desativa (nunca apaga) e grava a auditoria, na mesma transação.
    async fn deactivate_credit_limits(&self, ids: &[Uuid], audit: &AuditEntry) -> Result<u64, AppError>;

    async fn set_active_applications(
        &self,
        fixes: &[ActiveApplicationFix],
        audit: &AuditEntry,
    ) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct RemediationService {
    store: Arc<dyn RemediationStore>,
}

impl RemediationService {
    pub fn new(store: Arc<dyn RemediationStore>) -> Self {
        Self { store }
    }

    fn ensure_admin(actor: &Actor) -> Result<(), AppError> {
        match (actor, access_policy::resolve_access(actor, ModuleName::Settings)) {
            (Actor::User(_), AccessLevel::Full) => Ok(()),
            _ => Err(AppError::ModuleAccessDenied(ModuleName::Settings.to_string())),
        }
    }

    pub async fn remove_redundant_credit_limits(&self, actor: &Actor) -> Result<RemediationReport, AppError> {
        Self::ensure_admin(actor)?;

        let rows = self.store.live_credit_limits().await?;
        let plan = plan_dedup(&rows);
        let ids: Vec<Uuid> = plan.iter().flat_map(|a| a.deactivate.iter().copied()).collect();

        if !ids.is_empty() {
            let changes = plan
                .iter()
                .flat_map(|action| {
                    action.deactivate.iter().map(move |id| AuditChange {
                        record_id: *id,
                        before: json!({"isActive": true}),
                        after: json!({"isActive": false, "keptRecordId": action.keep}),
                    })
                })
                .collect();
            let audit = AuditEntry {
                entity_type: ENTITY_CLIENT_DEBTOR,
                action: ACTION_DEDUPE,
                user_id: Some(actor.id()),
                changes,
            };
            self.store.deactivate_credit_limits(&ids, &audit).await?;
        }

        tracing::info!(
            "🧹 {}: {} vínculos vivos, {} pares duplicados, {} desativados",
            ACTION_DEDUPE,
            rows.len(),
            plan.len(),
            ids.len()
        );
        Ok(RemediationReport {
            action: ACTION_DEDUPE,
            examined: rows.len(),
            changed: ids.len(),
        })
    }

    pub async fn recompute_active_applications(&self, actor: &Actor) -> Result<RemediationReport, AppError> {
        Self::ensure_admin(actor)?;

        let (links, applications) = tokio::try_join!(
            self.store.credit_limit_links(),
            self.store.resolved_applications(),
        )?;
        let fixes = plan_active_application(&links, &applications);

        if !fixes.is_empty() {
            let audit = AuditEntry {
                entity_type: ENTITY_CLIENT_DEBTOR,
                action: ACTION_ACTIVE_APPLICATION,
                user_id: Some(actor.id()),
                changes: fixes
                    .iter()
                    .map(|fix| AuditChange {
                        record_id: fix.client_debtor_id,
                        before: json!({"activeApplicationId": fix.before}),
                        after: json!({"activeApplicationId": fix.after}),
                    })
                    .collect(),
            };
            self.store.set_active_applications(&fixes, &audit).await?;
        }

        tracing::info!(
            "🧹 {}: {} vínculos examinados, {} corrigidos",
            ACTION_ACTIVE_APPLICATION,
            links.len(),
            fixes.len()
        );
        Ok(RemediationReport {
            action: ACTION_ACTIVE_APPLICATION,
            examined: links.len(),
            changed: fixes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::access::AccessType,
        services::access_policy::test_support::{client_user, user_with},
    };
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn live(client: Uuid, debtor: Uuid, decided: Option<u32>, updated: u32) -> LiveCreditLimit {
        LiveCreditLimit {
            id: Uuid::new_v4(),
            client_id: client,
            debtor_id: debtor,
            active_application_id: decided.map(|_| Uuid::new_v4()),
            active_application_decided_at: decided.map(at),
            updated_at: at(updated),
        }
    }

    #[test]
    fn dedup_keeps_the_most_recent_active_application() {
        let (c, d) = (Uuid::new_v4(), Uuid::new_v4());
        let older = live(c, d, Some(2), 20);
        let newest = live(c, d, Some(10), 3);
        let undecided = live(c, d, None, 25);
        let single = live(Uuid::new_v4(), d, None, 1);

        let plan = plan_dedup(&[older.clone(), newest.clone(), undecided.clone(), single]);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].keep, newest.id);
        let mut expected = vec![older.id, undecided.id];
        expected.sort();
        assert_eq!(plan[0].deactivate, expected);
    }

    #[test]
    fn dedup_falls_back_to_last_update() {
        let (c, d) = (Uuid::new_v4(), Uuid::new_v4());
        let stale = live(c, d, None, 1);
        let fresh = live(c, d, None, 5);

        let plan = plan_dedup(&[stale, fresh.clone()]);
        assert_eq!(plan[0].keep, fresh.id);
    }

    fn decision(client: Uuid, debtor: Uuid, status: ApplicationStatus, decided: Option<u32>) -> ApplicationDecision {
        ApplicationDecision {
            id: Uuid::new_v4(),
            client_id: client,
            debtor_id: debtor,
            status,
            approval_or_declining_date: decided.map(at),
            updated_at: at(1),
        }
    }

    #[test]
    fn active_application_is_latest_resolved_decision() {
        let (c, d) = (Uuid::new_v4(), Uuid::new_v4());
        let approved = decision(c, d, ApplicationStatus::Approved, Some(3));
        let declined = decision(c, d, ApplicationStatus::Declined, Some(9));
        let pending = decision(c, d, ApplicationStatus::Submitted, Some(20));
        let link = CreditLimitLink {
            id: Uuid::new_v4(),
            client_id: c,
            debtor_id: d,
            active_application_id: Some(approved.id),
        };

        let fixes = plan_active_application(&[link.clone()], &[approved.clone(), declined.clone(), pending]);
        assert_eq!(
            fixes,
            vec![ActiveApplicationFix {
                client_debtor_id: link.id,
                before: Some(approved.id),
                after: declined.id,
            }]
        );

        // Já correto: nada a fazer
        let fixed = CreditLimitLink {
            active_application_id: Some(declined.id),
            ..link
        };
        assert!(plan_active_application(&[fixed], &[approved, declined]).is_empty());
    }

    #[derive(Default)]
    struct InMemoryLimits {
        live: Mutex<Vec<LiveCreditLimit>>,
        audits: Mutex<Vec<AuditEntry>>,
    }

    #[async_trait]
    impl RemediationStore for InMemoryLimits {
        async fn live_credit_limits(&self) -> Result<Vec<LiveCreditLimit>, AppError> {
            Ok(self.live.lock().unwrap().clone())
        }

        async fn credit_limit_links(&self) -> Result<Vec<CreditLimitLink>, AppError> {
            Ok(Vec::new())
        }

        async fn resolved_applications(&self) -> Result<Vec<ApplicationDecision>, AppError> {
            Ok(Vec::new())
        }

        async fn deactivate_credit_limits(&self, ids: &[Uuid], audit: &AuditEntry) -> Result<u64, AppError> {
            self.live.lock().unwrap().retain(|r| !ids.contains(&r.id));
            self.audits.lock().unwrap().push(audit.clone());
            Ok(ids.len() as u64)
        }

        async fn set_active_applications(&self, fixes: &[ActiveApplicationFix], audit: &AuditEntry) -> Result<u64, AppError> {
            self.audits.lock().unwrap().push(audit.clone());
            Ok(fixes.len() as u64)
        }
    }

    #[tokio::test]
    async fn dedupe_is_idempotent_and_audited() {
        let (c, d) = (Uuid::new_v4(), Uuid::new_v4());
        let store = Arc::new(InMemoryLimits {
            live: Mutex::new(vec![live(c, d, Some(1), 1), live(c, d, Some(2), 2), live(c, d, None, 3)]),
            ..Default::default()
        });
        let service = RemediationService::new(store.clone());
        let admin = user_with(Uuid::new_v4(), &[("settings", &[AccessType::FullAccess])]);

        let first = service.remove_redundant_credit_limits(&admin).await.unwrap();
        let second = service.remove_redundant_credit_limits(&admin).await.unwrap();

        assert_eq!(first.changed, 2);
        assert_eq!(second.changed, 0);
        let audits = store.audits.lock().unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].changes.len(), 2);
        assert_eq!(audits[0].changes[0].after["isActive"], false);
    }

    #[tokio::test]
    async fn only_settings_admins_may_run_routines() {
        let service = RemediationService::new(Arc::new(InMemoryLimits::default()));

        let reader = user_with(Uuid::new_v4(), &[("settings", &[AccessType::Read])]);
        assert!(matches!(
            service.recompute_active_applications(&reader).await,
            Err(AppError::ModuleAccessDenied(_))
        ));

        let portal = client_user(Uuid::new_v4(), Uuid::new_v4());
        assert!(service.remove_redundant_credit_limits(&portal).await.is_err());
    }
}
