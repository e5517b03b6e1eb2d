// src/services/search_service.rs
//
// Busca global (fan-out por módulo, fan-in na ordem dos módulos) e busca por
// tipo de entidade (typeahead). Cada módulo recebe o predicado de escopo já
// resolvido; quem executa a consulta é um `ModuleSearcher`.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;

use crate::{
    common::{error::AppError, response::Paginated},
    models::{
        access::AccessLevel,
        auth::Actor,
        search::{EntityOption, EntitySearchResult, ResultEnvelope, SearchTarget},
    },
    services::{
        access_policy, module_registry,
        scope_resolver::{EntityKind, ScopePredicate, ScopeResolver},
    },
};

static DENY: ScopePredicate = ScopePredicate::Deny;

/// Predicados resolvidos para as entidades que um alvo de busca toca.
#[derive(Debug, Default)]
pub struct SearchScopes(HashMap<EntityKind, ScopePredicate>);

impl SearchScopes {
    pub fn with(mut self, kind: EntityKind, predicate: ScopePredicate) -> Self {
        self.0.insert(kind, predicate);
        self
    }

    /// Tipo não resolvido = nada visível.
    pub fn get(&self, kind: EntityKind) -> &ScopePredicate {
        self.0.get(&kind).unwrap_or(&DENY)
    }
}

/// Entidades lidas por cada alvo: a do módulo dono (ou a sub-entidade casada)
/// seguida dos usuários aninhados que a busca também varre.
pub fn scope_kinds(target: SearchTarget) -> Vec<EntityKind> {
    let primary = match target {
        SearchTarget::DebtorDirector => Some(EntityKind::DebtorDirector),
        _ => module_registry::module_of(target).and_then(|m| module_registry::descriptor(m).entity),
    };
    let nested = match target {
        SearchTarget::Client => Some(EntityKind::ClientUser),
        SearchTarget::Insurer => Some(EntityKind::InsurerUser),
        _ => None,
    };
    primary.into_iter().chain(nested).collect()
}

#[async_trait]
pub trait ModuleSearcher: Send + Sync {
    fn target(&self) -> SearchTarget;

    /// Busca textual já no formato do envelope uniforme.
    async fn search(&self, scopes: &SearchScopes, term: &str) -> Result<Vec<ResultEnvelope>, AppError>;

    /// Campos crus de identificação dos registros que casam com o texto.
    async fn options(&self, scopes: &SearchScopes, term: &str) -> Result<Vec<EntityOption>, AppError>;

    /// Listagem paginada (sem texto), devolve `(página, total)`.
    async fn list_options(
        &self,
        scopes: &SearchScopes,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<EntityOption>, i64), AppError>;
}

#[derive(Clone)]
pub struct SearchService {
    resolver: ScopeResolver,
    searchers: Vec<Arc<dyn ModuleSearcher>>,
}

impl SearchService {
    pub fn new(resolver: ScopeResolver, mut searchers: Vec<Arc<dyn ModuleSearcher>>) -> Self {
        // A concatenação segue a ordem de enumeração dos módulos
        searchers.sort_by_key(|s| {
            SearchTarget::ALL
                .iter()
                .position(|t| *t == s.target())
                .unwrap_or(usize::MAX)
        });
        Self { resolver, searchers }
    }

    fn searcher(&self, target: SearchTarget) -> Option<&Arc<dyn ModuleSearcher>> {
        self.searchers.iter().find(|s| s.target() == target)
    }

    async fn scopes_for(
        &self,
        actor: &Actor,
        target: SearchTarget,
        access: AccessLevel,
    ) -> Result<SearchScopes, AppError> {
        let mut scopes = SearchScopes::default();
        for kind in scope_kinds(target) {
            let predicate = self.resolver.scope_filter(actor, kind, access, None).await?;
            scopes = scopes.with(kind, predicate);
        }
        Ok(scopes)
    }

    /// Busca global. Módulos sem acesso são pulados; a falha de um módulo
    /// é logada e conta como "sem resultados" para ele.
    pub async fn global_search(&self, actor: &Actor, term: &str) -> Vec<ResultEnvelope> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }

        let searches = self.searchers.iter().filter_map(|searcher| {
            let target = searcher.target();
            let access = access_policy::resolve_access(actor, module_registry::module_of(target)?);
            if access == AccessLevel::None {
                return None;
            }

            Some(async move {
                let outcome = async {
                    let scopes = self.scopes_for(actor, target, access).await?;
                    searcher.search(&scopes, term).await
                }
                .await;

                match outcome {
                    Ok(hits) => hits,
                    Err(e) => {
                        tracing::error!("🔥 Busca global falhou no módulo '{}': {}", target.as_str(), e);
                        Vec::new()
                    }
                }
            })
        });

        join_all(searches).await.into_iter().flatten().collect()
    }

    /// Typeahead por tipo de entidade. Com texto devolve os matches; sem texto,
    /// a listagem paginada já escopada. Aqui os erros sobem.
    pub async fn entity_search(
        &self,
        actor: &Actor,
        target: SearchTarget,
        term: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<EntitySearchResult, AppError> {
        let term = term.map(str::trim).filter(|t| !t.is_empty());
        let access = module_registry::module_of(target)
            .map_or(AccessLevel::None, |module| access_policy::resolve_access(actor, module));

        let Some(searcher) = self.searcher(target).filter(|_| access != AccessLevel::None) else {
            return Ok(match term {
                Some(_) => EntitySearchResult::Matches(Vec::new()),
                None => EntitySearchResult::Listing(Paginated::empty(page, limit)),
            });
        };

        let scopes = self.scopes_for(actor, target, access).await?;
        match term {
            Some(term) => Ok(EntitySearchResult::Matches(searcher.options(&scopes, term).await?)),
            None => {
                let (docs, total) = searcher.list_options(&scopes, page, limit).await?;
                Ok(EntitySearchResult::Listing(Paginated::new(docs, total, page, limit)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::text::contains_ignore_case,
        models::access::{AccessType, ModuleName},
        services::{
            access_policy::test_support::{client_user, user_with},
            scope_resolver::{test_support::FakeOwnership, ScopeCandidate},
        },
    };
    use uuid::Uuid;

    /// Buscador em memória: aplica o escopo e o "contém" sobre linhas fixas.
    struct InMemorySearcher {
        target: SearchTarget,
        rows: Vec<(ScopeCandidate, String)>,
    }

    impl InMemorySearcher {
        fn visible<'a>(&'a self, scopes: &'a SearchScopes) -> impl Iterator<Item = &'a (ScopeCandidate, String)> {
            let kind = scope_kinds(self.target)[0];
            self.rows.iter().filter(move |(row, _)| scopes.get(kind).admits(row))
        }
    }

    #[async_trait]
    impl ModuleSearcher for InMemorySearcher {
        fn target(&self) -> SearchTarget {
            self.target
        }

        async fn search(&self, scopes: &SearchScopes, term: &str) -> Result<Vec<ResultEnvelope>, AppError> {
            Ok(self
                .visible(scopes)
                .filter(|(_, title)| contains_ignore_case(title, term))
                .map(|(row, title)| {
                    let module = module_registry::module_of(self.target).unwrap();
                    ResultEnvelope::top_level(row.id, title.clone(), module)
                })
                .collect())
        }

        async fn options(&self, scopes: &SearchScopes, term: &str) -> Result<Vec<EntityOption>, AppError> {
            Ok(self
                .visible(scopes)
                .filter(|(_, title)| contains_ignore_case(title, term))
                .map(|(row, title)| EntityOption::new(row.id).with("name", title.clone()))
                .collect())
        }

        async fn list_options(
            &self,
            scopes: &SearchScopes,
            page: i64,
            limit: i64,
        ) -> Result<(Vec<EntityOption>, i64), AppError> {
            let all: Vec<_> = self.visible(scopes).collect();
            let docs = all
                .iter()
                .skip(crate::common::pagination::page_offset(page, limit) as usize)
                .take(limit as usize)
                .map(|(row, title)| EntityOption::new(row.id).with("name", title.clone()))
                .collect();
            Ok((docs, all.len() as i64))
        }
    }

    struct FailingSearcher(SearchTarget);

    #[async_trait]
    impl ModuleSearcher for FailingSearcher {
        fn target(&self) -> SearchTarget {
            self.0
        }

        async fn search(&self, _: &SearchScopes, _: &str) -> Result<Vec<ResultEnvelope>, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("índice indisponível")))
        }

        async fn options(&self, _: &SearchScopes, _: &str) -> Result<Vec<EntityOption>, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("índice indisponível")))
        }

        async fn list_options(&self, _: &SearchScopes, _: i64, _: i64) -> Result<(Vec<EntityOption>, i64), AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("índice indisponível")))
        }
    }

    fn row(id: Uuid, client_id: Option<Uuid>) -> ScopeCandidate {
        ScopeCandidate {
            id,
            client_id,
            ..Default::default()
        }
    }

    struct Portfolio {
        u1: Uuid,
        c1: Uuid,
        acme_c1: Uuid,
        acme_c2: Uuid,
        service: SearchService,
    }

    // C1 pertence a U1, C2 a U2; cada um tem um devedor "Acme Pty Ltd" próprio.
    fn portfolio(extra: Vec<Arc<dyn ModuleSearcher>>) -> Portfolio {
        let (u1, u2, c1, c2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (acme_c1, acme_c2) = (Uuid::new_v4(), Uuid::new_v4());

        let ownership = FakeOwnership::default()
            .own(u1, c1)
            .own(u2, c2)
            .link(c1, acme_c1)
            .link(c2, acme_c2);

        let mut searchers: Vec<Arc<dyn ModuleSearcher>> = vec![
            Arc::new(InMemorySearcher {
                target: SearchTarget::Debtor,
                rows: vec![
                    (row(acme_c1, None), "Acme Pty Ltd".into()),
                    (row(acme_c2, None), "Acme Pty Ltd".into()),
                ],
            }),
            Arc::new(InMemorySearcher {
                target: SearchTarget::Client,
                rows: vec![
                    (row(c1, None), "Acme Group".into()),
                    (row(c2, None), "Acme Holdings".into()),
                ],
            }),
        ];
        searchers.extend(extra);

        Portfolio {
            u1,
            c1,
            acme_c1,
            acme_c2,
            service: SearchService::new(ScopeResolver::new(Arc::new(ownership)), searchers),
        }
    }

    #[test]
    fn scope_kinds_start_with_the_module_entity() {
        assert_eq!(
            scope_kinds(SearchTarget::Client),
            vec![EntityKind::Client, EntityKind::ClientUser]
        );
        assert_eq!(
            scope_kinds(SearchTarget::Insurer),
            vec![EntityKind::Insurer, EntityKind::InsurerUser]
        );
        assert_eq!(scope_kinds(SearchTarget::Application), vec![EntityKind::Application]);
        assert_eq!(scope_kinds(SearchTarget::DebtorDirector), vec![EntityKind::DebtorDirector]);
    }

    #[tokio::test]
    async fn own_user_only_reaches_debtors_through_owned_clients() {
        let p = portfolio(vec![]);
        let actor = user_with(p.u1, &[("debtor", &[AccessType::Read])]);

        let hits = p.service.global_search(&actor, "Acme").await;

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, p.acme_c1);
        assert_eq!(hits[0].module, ModuleName::Debtor);
    }

    #[tokio::test]
    async fn results_follow_module_order_and_skip_denied_modules() {
        let p = portfolio(vec![]);
        let actor = user_with(
            p.u1,
            &[("debtor", &[AccessType::FullAccess]), ("client", &[AccessType::Read])],
        );

        let hits = p.service.global_search(&actor, "acme").await;
        let modules: Vec<ModuleName> = hits.iter().map(|h| h.module).collect();

        // client vem antes de debtor na enumeração
        assert_eq!(
            modules,
            vec![ModuleName::Client, ModuleName::Debtor, ModuleName::Debtor]
        );
        assert_eq!(hits[0].id, p.c1);
        assert!(hits.iter().any(|h| h.id == p.acme_c2));

        let no_access = user_with(p.u1, &[]);
        assert!(p.service.global_search(&no_access, "acme").await.is_empty());
    }

    #[tokio::test]
    async fn failing_module_degrades_to_no_results() {
        let p = portfolio(vec![Arc::new(FailingSearcher(SearchTarget::Task))]);
        let actor = user_with(
            p.u1,
            &[("debtor", &[AccessType::Read]), ("task", &[AccessType::Read])],
        );

        let hits = p.service.global_search(&actor, "Acme").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, p.acme_c1);
    }

    #[tokio::test]
    async fn client_user_never_sees_other_tenants() {
        let p = portfolio(vec![]);
        let actor = client_user(Uuid::new_v4(), p.c1);

        let hits = p.service.global_search(&actor, "Acme").await;
        assert!(hits.iter().all(|h| h.id == p.c1 || h.id == p.acme_c1));
        assert!(!hits.is_empty());
    }

    #[tokio::test]
    async fn entity_search_without_text_lists_scoped_page() {
        let p = portfolio(vec![]);
        let actor = user_with(p.u1, &[("debtor", &[AccessType::Read])]);

        let result = p
            .service
            .entity_search(&actor, SearchTarget::Debtor, Some("  "), 1, 10)
            .await
            .unwrap();
        match result {
            EntitySearchResult::Listing(page) => {
                assert_eq!(page.total, 1);
                assert_eq!(page.docs[0].id, p.acme_c1);
            }
            other => panic!("esperava listagem, veio {other:?}"),
        }
    }

    #[tokio::test]
    async fn entity_search_errors_propagate() {
        let p = portfolio(vec![Arc::new(FailingSearcher(SearchTarget::Task))]);
        let actor = user_with(p.u1, &[("task", &[AccessType::Read])]);

        let result = p
            .service
            .entity_search(&actor, SearchTarget::Task, Some("x"), 1, 10)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn entity_search_without_access_is_empty() {
        let p = portfolio(vec![]);
        let actor = user_with(p.u1, &[]);

        let result = p
            .service
            .entity_search(&actor, SearchTarget::Debtor, Some("acme"), 1, 10)
            .await
            .unwrap();
        assert!(matches!(result, EntitySearchResult::Matches(ref m) if m.is_empty()));
    }
}
