// src/services/note_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        access::ModuleName,
        auth::Actor,
        note::Note,
    },
    services::{
        access_policy,
        scope_resolver::{ScopePredicate, ScopeResolver},
    },
};

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Notas da entidade que passam no predicado, mais recentes primeiro.
    async fn notes_for_entity(
        &self,
        entity_type: ModuleName,
        entity_id: Uuid,
        scope: &ScopePredicate,
    ) -> Result<Vec<Note>, AppError>;
}

#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn NoteStore>,
    resolver: ScopeResolver,
}

impl NoteService {
    pub fn new(store: Arc<dyn NoteStore>, resolver: ScopeResolver) -> Self {
        Self { store, resolver }
    }

    pub async fn list_for_entity(
        &self,
        actor: &Actor,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<Note>, AppError> {
        let entity_type: ModuleName = entity_type.parse().map_err(AppError::BadRequest)?;

        let access = access_policy::resolve_access(actor, ModuleName::Note);
        let scope = self
            .resolver
            .module_scope(actor, ModuleName::Note, access, None)
            .await?;
        if scope.is_deny() {
            return Ok(Vec::new());
        }

        self.store.notes_for_entity(entity_type, entity_id, &scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{access::AccessType, note::NoteAuthorType},
        services::{
            access_policy::test_support::{client_user, user_with},
            scope_resolver::{test_support::FakeOwnership, NoteFacts, ScopeCandidate},
        },
    };
    use chrono::Utc;

    struct InMemoryNotes(Vec<Note>);

    #[async_trait]
    impl NoteStore for InMemoryNotes {
        async fn notes_for_entity(
            &self,
            entity_type: ModuleName,
            entity_id: Uuid,
            scope: &ScopePredicate,
        ) -> Result<Vec<Note>, AppError> {
            Ok(self
                .0
                .iter()
                .filter(|n| n.entity_type == entity_type.as_str() && n.entity_id == entity_id)
                .filter(|n| {
                    scope.admits(&ScopeCandidate {
                        id: n.id,
                        client_id: n.client_id,
                        note: Some(NoteFacts {
                            is_public: n.is_public,
                            author_type: n.author_type(),
                            author_id: n.created_by_id,
                        }),
                        ..Default::default()
                    })
                })
                .cloned()
                .collect())
        }
    }

    fn note(entity_id: Uuid, client_id: Uuid, author: NoteAuthorType, author_id: Uuid, is_public: bool) -> Note {
        Note {
            id: Uuid::new_v4(),
            entity_type: "debtor".into(),
            entity_id,
            client_id: Some(client_id),
            description: "Pagamentos em dia".into(),
            is_public,
            created_by_type: author.as_str().into(),
            created_by_id: author_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn each_audience_sees_its_notes() {
        let (debtor, client, author) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let private = note(debtor, client, NoteAuthorType::User, author, false);
        let public = note(debtor, client, NoteAuthorType::User, author, true);
        let portal = note(debtor, client, NoteAuthorType::ClientUser, Uuid::new_v4(), false);
        let service = NoteService::new(
            Arc::new(InMemoryNotes(vec![private.clone(), public.clone(), portal.clone()])),
            ScopeResolver::new(Arc::new(FakeOwnership::default())),
        );

        let colleague = user_with(Uuid::new_v4(), &[("note", &[AccessType::FullAccess])]);
        let seen = service.list_for_entity(&colleague, "debtor", debtor).await.unwrap();
        let ids: Vec<Uuid> = seen.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![public.id, portal.id]);

        let creator = user_with(author, &[("note", &[AccessType::FullAccess])]);
        assert_eq!(service.list_for_entity(&creator, "debtor", debtor).await.unwrap().len(), 3);

        let tenant = client_user(Uuid::new_v4(), client);
        let seen = service.list_for_entity(&tenant, "debtor", debtor).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, portal.id);

        let outsider = client_user(Uuid::new_v4(), Uuid::new_v4());
        assert!(service.list_for_entity(&outsider, "debtor", debtor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn own_user_reads_notes_on_entities_without_client() {
        let (debtor, owner, owned_client) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let detached = |author_id, is_public| Note {
            client_id: None,
            ..note(debtor, owned_client, NoteAuthorType::User, author_id, is_public)
        };
        let mine = detached(owner, false);
        let shared = detached(Uuid::new_v4(), true);
        let hidden = detached(Uuid::new_v4(), false);
        let foreign = note(debtor, Uuid::new_v4(), NoteAuthorType::User, owner, false);
        let service = NoteService::new(
            Arc::new(InMemoryNotes(vec![mine.clone(), shared.clone(), hidden, foreign])),
            ScopeResolver::new(Arc::new(FakeOwnership::default().own(owner, owned_client))),
        );

        let actor = user_with(owner, &[("note", &[AccessType::Read])]);
        let ids: Vec<Uuid> = service
            .list_for_entity(&actor, "debtor", debtor)
            .await
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![mine.id, shared.id]);
    }

    #[tokio::test]
    async fn unknown_entity_type_is_a_bad_request() {
        let service = NoteService::new(
            Arc::new(InMemoryNotes(vec![])),
            ScopeResolver::new(Arc::new(FakeOwnership::default())),
        );
        let actor = user_with(Uuid::new_v4(), &[("note", &[AccessType::Read])]);
        assert!(matches!(
            service.list_for_entity(&actor, "invoice", Uuid::new_v4()).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
