// src/services/client_service.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::ListQuery, response::Paginated},
    models::{
        access::{AccessLevel, ModuleName},
        auth::Actor,
        client::Client,
        crm::{AddClientFromCrmPayload, ClientSyncSummary, CrmAccount, CrmContact, CrmPolicy},
    },
    services::{
        access_policy, column_service,
        crm_gateway::{decode_record, decode_records, CrmEntityType, CrmError, CrmGateway, CrmRecord},
        scope_resolver::{ScopePredicate, ScopeResolver},
    },
};

/// Colunas de referência da listagem de clientes e de onde vem o nome de cada uma.
const USER_REFERENCES: [&str; 2] = ["riskAnalystId", "serviceManagerId"];
const INSURER_REFERENCE: &str = "insurerId";

/// Tamanho da página ao puxar registros filhos do CRM.
const CRM_PAGE_SIZE: i64 = 100;

/// Tudo que vem do CRM para criar/atualizar um cliente.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    pub account: CrmAccount,
    pub contacts: Vec<CrmContact>,
    pub policies: Vec<CrmPolicy>,
    pub risk_analyst_id: Option<Uuid>,
    pub service_manager_id: Option<Uuid>,
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn list(&self, scope: &ScopePredicate, query: &ListQuery) -> Result<(Vec<Client>, i64), AppError>;

    async fn user_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError>;

    async fn insurer_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError>;

    /// Upsert do cliente (por `crm_client_id`), dos contatos (por `crm_contact_id`)
    /// e das apólices (por `crm_policy_id`), numa única transação.
    async fn sync_from_crm(&self, snapshot: &ClientSnapshot) -> Result<ClientSyncSummary, AppError>;
}

#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn ClientStore>,
    crm: Arc<dyn CrmGateway>,
    resolver: ScopeResolver,
}

impl ClientService {
    pub fn new(store: Arc<dyn ClientStore>, crm: Arc<dyn CrmGateway>, resolver: ScopeResolver) -> Self {
        Self { store, crm, resolver }
    }

    /// Listagem escopada, projetada nas colunas do ator, com referências trocadas por nomes.
    pub async fn list_clients(&self, actor: &Actor, query: &ListQuery) -> Result<Paginated<Value>, AppError> {
        let access = access_policy::resolve_access(actor, ModuleName::Client);
        let scope = self
            .resolver
            .module_scope(actor, ModuleName::Client, access, None)
            .await?;
        if scope.is_deny() {
            return Ok(Paginated::empty(query.page, query.limit));
        }

        let catalog = column_service::ColumnService::catalog(ModuleName::Client)?;
        let selected = column_service::selected_columns(actor.manage_columns(), catalog);

        let (clients, total) = self.store.list(&scope, query).await?;
        let rows = clients
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|e| AppError::InternalServerError(e.into()))?;

        let mut join_keys: Vec<&str> = USER_REFERENCES.to_vec();
        join_keys.push(INSURER_REFERENCE);
        let mut docs = column_service::project(rows, &selected, &join_keys);

        let user_ids: Vec<Uuid> = USER_REFERENCES
            .iter()
            .flat_map(|column| column_service::reference_ids(&docs, column))
            .collect();
        let insurer_ids = column_service::reference_ids(&docs, INSURER_REFERENCE);

        let (user_names, insurer_names) = tokio::try_join!(
            self.store.user_names(&user_ids),
            self.store.insurer_names(&insurer_ids),
        )?;
        for column in USER_REFERENCES {
            column_service::map_reference(&mut docs, column, &user_names);
        }
        column_service::map_reference(&mut docs, INSURER_REFERENCE, &insurer_names);

        Ok(Paginated::new(docs, total, query.page, query.limit)
            .with_headers(column_service::headers(&selected, catalog)))
    }

    /// "Adicionar do CRM": qualquer falha do CRM derruba a operação.
    pub async fn add_from_crm(
        &self,
        actor: &Actor,
        crm_client_id: &str,
        payload: &AddClientFromCrmPayload,
    ) -> Result<ClientSyncSummary, AppError> {
        if matches!(actor, Actor::ClientUser(_)) || !access_policy::can_write(actor, ModuleName::Client) {
            return Err(AppError::ModuleAccessDenied(ModuleName::Client.to_string()));
        }

        // 1. Conta no CRM
        let record = self
            .crm
            .fetch_entity(CrmEntityType::Account, crm_client_id)
            .await?
            .ok_or_else(|| CrmError::NotFound {
                entity: CrmEntityType::Account.path(),
                crm_id: crm_client_id.to_string(),
            })?;
        let account: CrmAccount = decode_record(CrmEntityType::Account.path(), record)?;

        // 2. Contatos e apólices (todas as páginas)
        let (contacts, policies) = tokio::try_join!(
            fetch_all_children(self.crm.as_ref(), CrmEntityType::Contact, &account.id),
            fetch_all_children(self.crm.as_ref(), CrmEntityType::Policy, &account.id),
        )?;
        let contacts: Vec<CrmContact> = decode_records(CrmEntityType::Contact.path(), contacts)?;
        let policies: Vec<CrmPolicy> = decode_records(CrmEntityType::Policy.path(), policies)?;

        // 3. Persistência
        let summary = self
            .store
            .sync_from_crm(&ClientSnapshot {
                account,
                contacts,
                policies,
                risk_analyst_id: payload.risk_analyst_id,
                service_manager_id: payload.service_manager_id,
            })
            .await?;

        tracing::info!(
            "✅ Cliente {} sincronizado do CRM ({} contatos, {} apólices)",
            crm_client_id,
            summary.contacts_synced,
            summary.policies_synced
        );
        Ok(summary)
    }

    /// Busca de contas no CRM para o "adicionar". Leitura: degrada para vazio.
    pub async fn search_crm(&self, actor: &Actor, keyword: &str) -> Vec<CrmAccount> {
        let keyword = keyword.trim();
        if keyword.is_empty()
            || access_policy::resolve_access(actor, ModuleName::Client) == AccessLevel::None
        {
            return Vec::new();
        }

        let outcome = async {
            let records = self.crm.search_entities(CrmEntityType::Account, keyword).await?;
            decode_records::<CrmAccount>(CrmEntityType::Account.path(), records)
        }
        .await;

        outcome.unwrap_or_else(|e| {
            tracing::warn!("⚠️ Busca de contas no CRM indisponível: {}", e);
            Vec::new()
        })
    }
}

/// Percorre todas as páginas de registros filhos de um pai no CRM.
pub async fn fetch_all_children(
    crm: &dyn CrmGateway,
    entity: CrmEntityType,
    parent_crm_id: &str,
) -> Result<Vec<CrmRecord>, CrmError> {
    let mut records = Vec::new();
    let mut page = 1;
    loop {
        let batch = crm
            .list_child_records(entity, parent_crm_id, page, CRM_PAGE_SIZE)
            .await?;
        let received = batch.list.len();
        records.extend(batch.list);

        if received == 0 || records.len() as i64 >= batch.total_count {
            return Ok(records);
        }
        page += 1;
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeCrm;
    use super::*;
    use crate::{
        models::{access::AccessType, columns::ColumnPreference},
        services::{
            access_policy::test_support::{client_user, user_with},
            scope_resolver::{test_support::FakeOwnership, ScopeCandidate},
        },
    };
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryClients {
        clients: Vec<Client>,
        users: HashMap<Uuid, String>,
        synced: Mutex<Vec<ClientSnapshot>>,
    }

    #[async_trait]
    impl ClientStore for InMemoryClients {
        async fn list(&self, scope: &ScopePredicate, _: &ListQuery) -> Result<(Vec<Client>, i64), AppError> {
            let visible: Vec<Client> = self
                .clients
                .iter()
                .filter(|c| {
                    scope.admits(&ScopeCandidate {
                        id: c.id,
                        ..Default::default()
                    })
                })
                .cloned()
                .collect();
            let total = visible.len() as i64;
            Ok((visible, total))
        }

        async fn user_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
            Ok(ids
                .iter()
                .filter_map(|id| self.users.get(id).map(|n| (*id, n.clone())))
                .collect())
        }

        async fn insurer_names(&self, _: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
            Ok(HashMap::new())
        }

        async fn sync_from_crm(&self, snapshot: &ClientSnapshot) -> Result<ClientSyncSummary, AppError> {
            self.synced.lock().unwrap().push(snapshot.clone());
            Ok(ClientSyncSummary {
                client_id: Uuid::new_v4(),
                contacts_synced: snapshot.contacts.len(),
                policies_synced: snapshot.policies.len(),
            })
        }
    }

    fn client(id: Uuid, name: &str, risk_analyst_id: Option<Uuid>) -> Client {
        Client {
            id,
            name: name.into(),
            crm_client_id: None,
            abn: Some("51 824 753 556".into()),
            acn: None,
            risk_analyst_id,
            service_manager_id: None,
            insurer_id: None,
            daily_request_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(store: InMemoryClients, crm: FakeCrm, ownership: FakeOwnership) -> ClientService {
        ClientService::new(
            Arc::new(store),
            Arc::new(crm),
            ScopeResolver::new(Arc::new(ownership)),
        )
    }

    #[tokio::test]
    async fn list_is_scoped_projected_and_named() {
        let (analyst, mine, theirs) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let store = InMemoryClients {
            clients: vec![client(mine, "Acme", Some(analyst)), client(theirs, "Globex", None)],
            users: HashMap::from([(analyst, "Ana Analyst".to_string())]),
            ..Default::default()
        };
        let svc = service(store, FakeCrm::default(), FakeOwnership::default().own(analyst, mine));

        let mut actor = user_with(analyst, &[("client", &[AccessType::Read])]);
        if let Actor::User(u) = &mut actor {
            u.manage_columns = vec![ColumnPreference {
                module_name: "client".into(),
                columns: vec!["name".into(), "riskAnalystId".into()],
            }];
        }

        let page = svc.list_clients(&actor, &ListQuery::default()).await.unwrap();

        assert_eq!(page.total, 1);
        let row = &page.docs[0];
        assert_eq!(row["_id"], mine.to_string());
        assert_eq!(row["name"], "Acme");
        assert_eq!(row["riskAnalystId"], "Ana Analyst");
        assert!(row.get("abn").is_none());
        let header_names: Vec<&str> = page.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(header_names, vec!["name", "riskAnalystId"]);
    }

    #[tokio::test]
    async fn list_without_access_is_empty() {
        let store = InMemoryClients {
            clients: vec![client(Uuid::new_v4(), "Acme", None)],
            ..Default::default()
        };
        let svc = service(store, FakeCrm::default(), FakeOwnership::default());
        let actor = user_with(Uuid::new_v4(), &[]);

        let page = svc.list_clients(&actor, &ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.docs.is_empty());
    }

    fn crm_with_account() -> FakeCrm {
        let mut crm = FakeCrm::default();
        crm.records.insert(
            ("accounts", "ACC-1".into()),
            json!({"id": "ACC-1", "name": "Acme Pty Ltd", "abn": "123"}),
        );
        crm.children.insert(
            ("contacts", "ACC-1".into()),
            (0..150)
                .map(|i| json!({"id": format!("C-{i}"), "firstName": "Jane", "lastName": format!("Doe {i}")}))
                .collect(),
        );
        crm.children.insert(
            ("policies", "ACC-1".into()),
            vec![json!({"id": "P-1", "product": "Credit Insurance - SME", "discretionaryLimit": 25000})],
        );
        crm
    }

    #[tokio::test]
    async fn add_from_crm_pulls_every_contact_page() {
        let svc = service(InMemoryClients::default(), crm_with_account(), FakeOwnership::default());
        let actor = user_with(Uuid::new_v4(), &[("client", &[AccessType::Write])]);

        let summary = svc
            .add_from_crm(
                &actor,
                "ACC-1",
                &AddClientFromCrmPayload {
                    risk_analyst_id: None,
                    service_manager_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(summary.contacts_synced, 150);
        assert_eq!(summary.policies_synced, 1);
    }

    #[tokio::test]
    async fn add_from_crm_maps_missing_account_to_not_found() {
        let svc = service(InMemoryClients::default(), FakeCrm::default(), FakeOwnership::default());
        let actor = user_with(Uuid::new_v4(), &[("client", &[AccessType::FullAccess])]);
        let payload = AddClientFromCrmPayload {
            risk_analyst_id: None,
            service_manager_id: None,
        };

        let err = svc.add_from_crm(&actor, "nope", &payload).await.unwrap_err();
        assert!(matches!(err, AppError::Crm(CrmError::NotFound { .. })));
    }

    #[tokio::test]
    async fn add_from_crm_propagates_outages_and_checks_write_access() {
        let crm = FakeCrm {
            fail: true,
            ..crm_with_account()
        };
        let svc = service(InMemoryClients::default(), crm, FakeOwnership::default());
        let payload = AddClientFromCrmPayload {
            risk_analyst_id: None,
            service_manager_id: None,
        };

        let writer = user_with(Uuid::new_v4(), &[("client", &[AccessType::Write])]);
        assert!(matches!(
            svc.add_from_crm(&writer, "ACC-1", &payload).await,
            Err(AppError::Crm(_))
        ));

        let reader = user_with(Uuid::new_v4(), &[("client", &[AccessType::Read])]);
        assert!(matches!(
            svc.add_from_crm(&reader, "ACC-1", &payload).await,
            Err(AppError::ModuleAccessDenied(_))
        ));

        let portal = client_user(Uuid::new_v4(), Uuid::new_v4());
        assert!(matches!(
            svc.add_from_crm(&portal, "ACC-1", &payload).await,
            Err(AppError::ModuleAccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn crm_search_degrades_on_outage() {
        let crm = FakeCrm {
            fail: true,
            ..Default::default()
        };
        let svc = service(InMemoryClients::default(), crm, FakeOwnership::default());
        let actor = user_with(Uuid::new_v4(), &[("client", &[AccessType::Read])]);

        assert!(svc.search_crm(&actor, "acme").await.is_empty());
    }
}
