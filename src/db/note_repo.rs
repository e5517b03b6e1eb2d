// src/db/note_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{access::ModuleName, note::Note},
    services::{note_service::NoteStore, scope_resolver::ScopePredicate},
};

#[derive(Clone)]
pub struct NoteRepository {
    pool: PgPool,
}

impl NoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn query<'a>(entity_type: ModuleName, entity_id: Uuid, scope: &ScopePredicate) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT n.* FROM notes n WHERE n.is_deleted = false AND n.entity_type = ");
        qb.push_bind(entity_type.as_str());
        qb.push(" AND n.entity_id = ");
        qb.push_bind(entity_id);
        qb.push(" AND ");
        scope.push_sql(&mut qb, "n");
        qb.push(" ORDER BY n.created_at DESC");
        qb
    }
}

#[async_trait]
impl NoteStore for NoteRepository {
    async fn notes_for_entity(
        &self,
        entity_type: ModuleName,
        entity_id: Uuid,
        scope: &ScopePredicate,
    ) -> Result<Vec<Note>, AppError> {
        let mut qb = Self::query(entity_type, entity_id, scope);
        let notes = qb.build_query_as::<Note>().fetch_all(&self.pool).await?;
        Ok(notes)
    }
}
