// src/services/scope_resolver.rs
//
// Traduz (ator, nível de acesso, id explícito opcional) num predicado de escopo
// por tipo de entidade. O mesmo predicado serve para montar SQL (`push_sql`)
// e para ser avaliado em memória (`admits`).

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        access::{AccessLevel, ModuleName},
        auth::Actor,
        note::NoteAuthorType,
    },
    services::module_registry,
};

/// Tipos de entidade que sabem ser escopados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Client,
    ClientUser,
    Debtor,
    DebtorDirector,
    ClientDebtor,
    Application,
    Task,
    Insurer,
    InsurerUser,
    Policy,
    Claim,
    Note,
}

/// Quem está lendo as notas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteViewer {
    Internal(Uuid),
    Tenant(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePredicate {
    /// Nada é visível.
    Deny,
    /// Sem restrição de dono.
    All,
    IdIn(Vec<Uuid>),
    ClientIn(Vec<Uuid>),
    DebtorIn(Vec<Uuid>),
    InsurerIn(Vec<Uuid>),
    /// `assignee_id = id OR created_by_id = id`
    OwnedBy(Uuid),
    /// Registros do CRM, casados pelo `accountid` (= `crm_client_id`).
    CrmAccountIn(Vec<String>),
    Notes {
        clients: Option<Vec<Uuid>>,
        viewer: NoteViewer,
    },
}

/// Fatos de uma nota necessários para avaliar a regra de visibilidade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteFacts {
    pub is_public: bool,
    pub author_type: NoteAuthorType,
    pub author_id: Uuid,
}

/// Uma linha candidata, reduzida às colunas que o escopo olha.
#[derive(Debug, Clone, Default)]
pub struct ScopeCandidate {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub debtor_id: Option<Uuid>,
    pub insurer_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub created_by_id: Option<Uuid>,
    pub crm_account_id: Option<String>,
    pub note: Option<NoteFacts>,
}

impl ScopePredicate {
    pub fn is_deny(&self) -> bool {
        matches!(self, ScopePredicate::Deny)
    }

    /// Acrescenta a condição (sem `WHERE`/`AND`) ao builder, sobre o alias da tabela.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        match self {
            ScopePredicate::Deny => {
                qb.push("FALSE");
            }
            ScopePredicate::All => {
                qb.push("TRUE");
            }
            ScopePredicate::IdIn(ids) => push_any(qb, alias, "id", ids),
            ScopePredicate::ClientIn(ids) => push_any(qb, alias, "client_id", ids),
            ScopePredicate::DebtorIn(ids) => push_any(qb, alias, "debtor_id", ids),
            ScopePredicate::InsurerIn(ids) => push_any(qb, alias, "insurer_id", ids),
            ScopePredicate::OwnedBy(user_id) => {
                qb.push(format!("({alias}.assignee_id = "));
                qb.push_bind(*user_id);
                qb.push(format!(" OR {alias}.created_by_id = "));
                qb.push_bind(*user_id);
                qb.push(")");
            }
            ScopePredicate::CrmAccountIn(crm_ids) => {
                if crm_ids.is_empty() {
                    qb.push("FALSE");
                } else {
                    qb.push(format!("{alias}.crm_client_id = ANY("));
                    qb.push_bind(crm_ids.clone());
                    qb.push(")");
                }
            }
            ScopePredicate::Notes { clients, viewer } => {
                qb.push("(");
                match viewer {
                    NoteViewer::Internal(user_id) => {
                        qb.push(format!(
                            "({alias}.created_by_type = 'client-user' OR {alias}.is_public OR {alias}.created_by_id = "
                        ));
                        qb.push_bind(*user_id);
                        qb.push(")");
                    }
                    NoteViewer::Tenant(client_id) => {
                        qb.push(format!(
                            "{alias}.created_by_type = 'client-user' AND {alias}.client_id = "
                        ));
                        qb.push_bind(*client_id);
                    }
                }
                if let Some(ids) = clients {
                    // Notas sem cliente (devedor, seguradora) não pertencem a tenant
                    match viewer {
                        NoteViewer::Internal(_) => {
                            qb.push(format!(" AND ({alias}.client_id IS NULL OR "));
                            push_any(qb, alias, "client_id", ids);
                            qb.push(")");
                        }
                        NoteViewer::Tenant(_) => {
                            qb.push(" AND ");
                            push_any(qb, alias, "client_id", ids);
                        }
                    }
                }
                qb.push(")");
            }
        }
    }

    /// Avaliação em memória; deve concordar com `push_sql`.
    pub fn admits(&self, row: &ScopeCandidate) -> bool {
        let within = |ids: &[Uuid], value: Option<Uuid>| value.is_some_and(|v| ids.contains(&v));

        match self {
            ScopePredicate::Deny => false,
            ScopePredicate::All => true,
            ScopePredicate::IdIn(ids) => ids.contains(&row.id),
            ScopePredicate::ClientIn(ids) => within(ids, row.client_id),
            ScopePredicate::DebtorIn(ids) => within(ids, row.debtor_id),
            ScopePredicate::InsurerIn(ids) => within(ids, row.insurer_id),
            ScopePredicate::OwnedBy(user_id) => {
                row.assignee_id == Some(*user_id) || row.created_by_id == Some(*user_id)
            }
            ScopePredicate::CrmAccountIn(crm_ids) => row
                .crm_account_id
                .as_ref()
                .is_some_and(|id| crm_ids.contains(id)),
            ScopePredicate::Notes { clients, viewer } => {
                let Some(note) = row.note else {
                    return false;
                };
                let visible = match viewer {
                    NoteViewer::Internal(user_id) => {
                        note.author_type == NoteAuthorType::ClientUser
                            || note.is_public
                            || note.author_id == *user_id
                    }
                    NoteViewer::Tenant(client_id) => {
                        note.author_type == NoteAuthorType::ClientUser
                            && row.client_id == Some(*client_id)
                    }
                };
                let in_tenant = match (viewer, row.client_id) {
                    (NoteViewer::Internal(_), None) => true,
                    _ => clients.as_ref().is_none_or(|ids| within(ids, row.client_id)),
                };
                visible && in_tenant
            }
        }
    }
}

fn push_any(qb: &mut QueryBuilder<'_, Postgres>, alias: &str, column: &str, ids: &[Uuid]) {
    if ids.is_empty() {
        qb.push("FALSE");
        return;
    }
    qb.push(format!("{alias}.{column} = ANY("));
    qb.push_bind(ids.to_vec());
    qb.push(")");
}

/// Consultas de posse que o resolvedor precisa. Implementado sobre o Postgres
/// por `db::scope_repo::ScopeRepository`.
#[async_trait]
pub trait OwnershipLookup: Send + Sync {
    /// Clientes onde o usuário é analista de risco OU gerente de serviço.
    async fn client_ids_owned_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Devedores distintos com vínculo ativo nesses clientes.
    async fn active_debtor_ids_for_clients(&self, client_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError>;

    /// Seguradoras ligadas a esses clientes por apólice.
    async fn insurer_ids_for_clients(&self, client_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError>;

    async fn crm_ids_for_clients(&self, client_ids: &[Uuid]) -> Result<Vec<String>, AppError>;
}

#[derive(Clone)]
pub struct ScopeResolver {
    lookup: Arc<dyn OwnershipLookup>,
}

impl ScopeResolver {
    pub fn new(lookup: Arc<dyn OwnershipLookup>) -> Self {
        Self { lookup }
    }

    /// Conjunto de clientes visíveis: `None` = sem restrição.
    ///
    /// Um id explícito estreita o conjunto. Usuário de cliente fica sempre preso
    /// ao próprio tenant; usuário `OWN` só enxerga o id explícito se for dono dele.
    pub async fn visible_clients(
        &self,
        actor: &Actor,
        access: AccessLevel,
        explicit_client: Option<Uuid>,
    ) -> Result<Option<Vec<Uuid>>, AppError> {
        if access == AccessLevel::None {
            return Ok(Some(Vec::new()));
        }

        match actor {
            Actor::ClientUser(cu) => Ok(Some(match explicit_client {
                Some(id) if id != cu.client_id => Vec::new(),
                _ => vec![cu.client_id],
            })),
            Actor::User(_) if access == AccessLevel::Full => {
                Ok(explicit_client.map(|id| vec![id]))
            }
            Actor::User(u) => {
                let owned = self.lookup.client_ids_owned_by(u.id).await?;
                Ok(Some(match explicit_client {
                    Some(id) => owned.into_iter().filter(|c| *c == id).collect(),
                    None => owned,
                }))
            }
        }
    }

    /// Falha com `OutOfScope` quando o cliente não está no conjunto visível do ator.
    pub async fn ensure_client_visible(
        &self,
        actor: &Actor,
        access: AccessLevel,
        client_id: Uuid,
    ) -> Result<(), AppError> {
        match self.visible_clients(actor, access, Some(client_id)).await? {
            Some(ids) if !ids.contains(&client_id) => Err(AppError::OutOfScope("cliente".into())),
            _ => Ok(()),
        }
    }

    /// Escopo da entidade que o módulo lista. Módulo sem entidade não enxerga nada.
    pub async fn module_scope(
        &self,
        actor: &Actor,
        module: ModuleName,
        access: AccessLevel,
        explicit_client: Option<Uuid>,
    ) -> Result<ScopePredicate, AppError> {
        match module_registry::descriptor(module).entity {
            Some(kind) => self.scope_filter(actor, kind, access, explicit_client).await,
            None => Ok(ScopePredicate::Deny),
        }
    }

    pub async fn scope_filter(
        &self,
        actor: &Actor,
        kind: EntityKind,
        access: AccessLevel,
        explicit_client: Option<Uuid>,
    ) -> Result<ScopePredicate, AppError> {
        if access == AccessLevel::None {
            return Ok(ScopePredicate::Deny);
        }

        // Usuários internos não pertencem a tenant nenhum
        if kind == EntityKind::User {
            return Ok(match (actor, access) {
                (Actor::ClientUser(_), _) => ScopePredicate::Deny,
                (Actor::User(_), AccessLevel::Full) => ScopePredicate::All,
                (Actor::User(u), _) => ScopePredicate::IdIn(vec![u.id]),
            });
        }

        // Tarefas de um usuário OWN: as que ele recebeu ou criou
        if let (EntityKind::Task, AccessLevel::Own, None, Actor::User(u)) =
            (kind, access, explicit_client, actor)
        {
            return Ok(ScopePredicate::OwnedBy(u.id));
        }

        // Seguradoras são globais para a equipe interna
        if matches!(kind, EntityKind::Insurer | EntityKind::InsurerUser)
            && matches!(actor, Actor::User(_))
            && explicit_client.is_none()
        {
            return Ok(ScopePredicate::All);
        }

        let clients = self.visible_clients(actor, access, explicit_client).await?;

        if kind == EntityKind::Note {
            let viewer = match actor {
                Actor::User(u) => NoteViewer::Internal(u.id),
                Actor::ClientUser(cu) => NoteViewer::Tenant(cu.client_id),
            };
            return Ok(ScopePredicate::Notes { clients, viewer });
        }

        let Some(clients) = clients else {
            return Ok(ScopePredicate::All);
        };

        Ok(match kind {
            EntityKind::Client => ScopePredicate::IdIn(clients),
            EntityKind::ClientUser
            | EntityKind::ClientDebtor
            | EntityKind::Application
            | EntityKind::Policy
            | EntityKind::Task => ScopePredicate::ClientIn(clients),
            EntityKind::Debtor => {
                ScopePredicate::IdIn(self.active_debtors(&clients).await?)
            }
            EntityKind::DebtorDirector => {
                ScopePredicate::DebtorIn(self.active_debtors(&clients).await?)
            }
            EntityKind::Insurer => {
                ScopePredicate::IdIn(self.insurers(&clients).await?)
            }
            EntityKind::InsurerUser => {
                ScopePredicate::InsurerIn(self.insurers(&clients).await?)
            }
            EntityKind::Claim => {
                if clients.is_empty() {
                    ScopePredicate::CrmAccountIn(Vec::new())
                } else {
                    ScopePredicate::CrmAccountIn(self.lookup.crm_ids_for_clients(&clients).await?)
                }
            }
            // tratados acima
            EntityKind::User | EntityKind::Note => ScopePredicate::Deny,
        })
    }

    async fn active_debtors(&self, clients: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if clients.is_empty() {
            return Ok(Vec::new());
        }
        self.lookup.active_debtor_ids_for_clients(clients).await
    }

    async fn insurers(&self, clients: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if clients.is_empty() {
            return Ok(Vec::new());
        }
        self.lookup.insurer_ids_for_clients(clients).await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeOwnership;
    use super::*;
    use crate::services::access_policy::test_support::{client_user, user_with};

    struct World {
        u1: Uuid,
        u2: Uuid,
        c1: Uuid,
        c2: Uuid,
        d_shared: Uuid,
        d_only_c2: Uuid,
        resolver: ScopeResolver,
    }

    fn world() -> World {
        let (u1, u2, c1, c2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (d_shared, d_only_c2) = (Uuid::new_v4(), Uuid::new_v4());
        let fake = FakeOwnership::default()
            .own(u1, c1)
            .own(u2, c2)
            .link(c1, d_shared)
            .link(c2, d_shared)
            .link(c2, d_only_c2)
            .crm(c1, "ACC-1")
            .crm(c2, "ACC-2");
        World {
            u1,
            u2,
            c1,
            c2,
            d_shared,
            d_only_c2,
            resolver: ScopeResolver::new(Arc::new(fake)),
        }
    }

    fn client_row(id: Uuid) -> ScopeCandidate {
        ScopeCandidate {
            id,
            ..Default::default()
        }
    }

    fn app_row(client_id: Uuid) -> ScopeCandidate {
        ScopeCandidate {
            id: Uuid::new_v4(),
            client_id: Some(client_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn own_user_sees_only_owned_clients() {
        let w = world();
        let actor = user_with(w.u1, &[]);
        let scope = w
            .resolver
            .scope_filter(&actor, EntityKind::Client, AccessLevel::Own, None)
            .await
            .unwrap();

        assert!(scope.admits(&client_row(w.c1)));
        assert!(!scope.admits(&client_row(w.c2)));
    }

    #[tokio::test]
    async fn own_user_debtors_come_from_active_links() {
        let w = world();
        let actor = user_with(w.u1, &[]);
        let scope = w
            .resolver
            .scope_filter(&actor, EntityKind::Debtor, AccessLevel::Own, None)
            .await
            .unwrap();

        assert_eq!(scope, ScopePredicate::IdIn(vec![w.d_shared]));
        assert!(!scope.admits(&client_row(w.d_only_c2)));
    }

    #[tokio::test]
    async fn explicit_client_outside_ownership_yields_nothing() {
        let w = world();
        let actor = user_with(w.u1, &[]);
        let scope = w
            .resolver
            .scope_filter(&actor, EntityKind::Application, AccessLevel::Own, Some(w.c2))
            .await
            .unwrap();

        assert_eq!(scope, ScopePredicate::ClientIn(vec![]));
        assert!(!scope.admits(&app_row(w.c2)));
    }

    #[tokio::test]
    async fn full_access_with_explicit_client_is_pinned() {
        let w = world();
        let actor = user_with(w.u2, &[]);
        let scope = w
            .resolver
            .scope_filter(&actor, EntityKind::Application, AccessLevel::Full, Some(w.c1))
            .await
            .unwrap();
        assert_eq!(scope, ScopePredicate::ClientIn(vec![w.c1]));
    }

    #[tokio::test]
    async fn module_scope_follows_the_registered_entity() {
        let w = world();
        let actor = user_with(w.u1, &[]);

        let clients = w
            .resolver
            .module_scope(&actor, ModuleName::Client, AccessLevel::Own, None)
            .await
            .unwrap();
        assert_eq!(clients, ScopePredicate::IdIn(vec![w.c1]));

        let claims = w
            .resolver
            .module_scope(&actor, ModuleName::Claim, AccessLevel::Own, None)
            .await
            .unwrap();
        assert_eq!(claims, ScopePredicate::CrmAccountIn(vec!["ACC-1".to_string()]));

        let dashboard = w
            .resolver
            .module_scope(&actor, ModuleName::Dashboard, AccessLevel::Full, None)
            .await
            .unwrap();
        assert!(dashboard.is_deny());
    }

    #[tokio::test]
    async fn none_access_denies_everything() {
        let w = world();
        let actor = user_with(w.u1, &[]);
        for kind in [EntityKind::Client, EntityKind::Debtor, EntityKind::Note, EntityKind::User] {
            let scope = w
                .resolver
                .scope_filter(&actor, kind, AccessLevel::None, None)
                .await
                .unwrap();
            assert!(scope.is_deny(), "{kind:?}");
        }
    }

    #[tokio::test]
    async fn client_user_is_isolated_to_its_tenant() {
        let w = world();
        let actor = client_user(Uuid::new_v4(), w.c1);

        for explicit in [None, Some(w.c1), Some(w.c2)] {
            let scope = w
                .resolver
                .scope_filter(&actor, EntityKind::Application, AccessLevel::Own, explicit)
                .await
                .unwrap();
            assert!(!scope.admits(&app_row(w.c2)), "explicit={explicit:?}");
        }

        let scope = w
            .resolver
            .scope_filter(&actor, EntityKind::Claim, AccessLevel::Own, None)
            .await
            .unwrap();
        assert_eq!(scope, ScopePredicate::CrmAccountIn(vec!["ACC-1".into()]));
    }

    #[tokio::test]
    async fn full_access_is_a_superset_of_own() {
        let w = world();
        let actor = user_with(w.u1, &[]);
        let rows: Vec<ScopeCandidate> = [w.c1, w.c2].into_iter().map(app_row).collect();

        for kind in [EntityKind::Application, EntityKind::Policy, EntityKind::ClientDebtor] {
            let own = w.resolver.scope_filter(&actor, kind, AccessLevel::Own, None).await.unwrap();
            let full = w.resolver.scope_filter(&actor, kind, AccessLevel::Full, None).await.unwrap();
            for row in &rows {
                if own.admits(row) {
                    assert!(full.admits(row));
                }
            }
        }
    }

    #[tokio::test]
    async fn own_tasks_are_assigned_or_created() {
        let w = world();
        let actor = user_with(w.u1, &[]);
        let scope = w
            .resolver
            .scope_filter(&actor, EntityKind::Task, AccessLevel::Own, None)
            .await
            .unwrap();

        let assigned = ScopeCandidate {
            assignee_id: Some(w.u1),
            ..Default::default()
        };
        let created = ScopeCandidate {
            created_by_id: Some(w.u1),
            ..Default::default()
        };
        let other = ScopeCandidate {
            assignee_id: Some(w.u2),
            ..Default::default()
        };
        assert!(scope.admits(&assigned));
        assert!(scope.admits(&created));
        assert!(!scope.admits(&other));
    }

    #[tokio::test]
    async fn note_visibility_rules() {
        let w = world();
        let author = w.u2;
        let note = |is_public, author_type, author_id, client_id| ScopeCandidate {
            id: Uuid::new_v4(),
            client_id: Some(client_id),
            note: Some(NoteFacts {
                is_public,
                author_type,
                author_id,
            }),
            ..Default::default()
        };
        let private_internal = note(false, NoteAuthorType::User, author, w.c1);
        let public_internal = note(true, NoteAuthorType::User, author, w.c1);
        let from_portal = note(false, NoteAuthorType::ClientUser, Uuid::new_v4(), w.c1);

        let staff = user_with(w.u1, &[]);
        let scope = w
            .resolver
            .scope_filter(&staff, EntityKind::Note, AccessLevel::Full, None)
            .await
            .unwrap();
        assert!(!scope.admits(&private_internal));
        assert!(scope.admits(&public_internal));
        assert!(scope.admits(&from_portal));

        let creator = user_with(author, &[]);
        let scope = w
            .resolver
            .scope_filter(&creator, EntityKind::Note, AccessLevel::Full, None)
            .await
            .unwrap();
        assert!(scope.admits(&private_internal));

        let portal = client_user(Uuid::new_v4(), w.c1);
        let scope = w
            .resolver
            .scope_filter(&portal, EntityKind::Note, AccessLevel::Own, None)
            .await
            .unwrap();
        assert!(scope.admits(&from_portal));
        assert!(!scope.admits(&public_internal));
        assert!(!scope.admits(&note(false, NoteAuthorType::ClientUser, Uuid::new_v4(), w.c2)));
    }

    #[tokio::test]
    async fn own_user_sees_notes_without_client() {
        let w = world();
        let unattached = |is_public, author_id| ScopeCandidate {
            id: Uuid::new_v4(),
            client_id: None,
            note: Some(NoteFacts {
                is_public,
                author_type: NoteAuthorType::User,
                author_id,
            }),
            ..Default::default()
        };
        let own_private = unattached(false, w.u1);
        let colleague_public = unattached(true, w.u2);
        let colleague_private = unattached(false, w.u2);

        let scope = w
            .resolver
            .scope_filter(&user_with(w.u1, &[]), EntityKind::Note, AccessLevel::Own, None)
            .await
            .unwrap();
        assert!(scope.admits(&own_private));
        assert!(scope.admits(&colleague_public));
        assert!(!scope.admits(&colleague_private));

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM notes n WHERE ");
        scope.push_sql(&mut qb, "n");
        assert!(qb.sql().ends_with("AND (n.client_id IS NULL OR n.client_id = ANY($2)))"));
    }

    #[test]
    fn empty_sets_render_as_false() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM clients c WHERE ");
        ScopePredicate::IdIn(vec![]).push_sql(&mut qb, "c");
        assert!(qb.sql().ends_with("FALSE"));

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM clients c WHERE ");
        ScopePredicate::ClientIn(vec![Uuid::new_v4()]).push_sql(&mut qb, "c");
        assert!(qb.sql().ends_with("c.client_id = ANY($1)"));
    }
}
