// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{Actor, ActorKind, ClientUser, User},
        columns::ColumnPreference,
    },
    services::column_service::ColumnPreferenceStore,
};

// O repositório dos atores: usuários internos e usuários de cliente
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário interno ativo pelo ID
    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_deleted = false")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Busca um usuário de cliente ativo pelo ID
    pub async fn find_client_user(&self, id: Uuid) -> Result<Option<ClientUser>, AppError> {
        let client_user = sqlx::query_as::<_, ClientUser>(
            "SELECT * FROM client_users WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client_user)
    }

    /// Carrega o ator do token. Usuário de cliente sem acesso ao portal não entra.
    pub async fn find_actor(&self, kind: ActorKind, id: Uuid) -> Result<Option<Actor>, AppError> {
        match kind {
            ActorKind::User => Ok(self.find_user(id).await?.map(Actor::User)),
            ActorKind::ClientUser => Ok(self
                .find_client_user(id)
                .await?
                .filter(|cu| cu.has_portal_access)
                .map(Actor::ClientUser)),
        }
    }
}

#[async_trait]
impl ColumnPreferenceStore for UserRepository {
    async fn save_columns(&self, actor: &Actor, prefs: &[ColumnPreference]) -> Result<(), AppError> {
        let table = match actor {
            Actor::User(_) => "users",
            Actor::ClientUser(_) => "client_users",
        };
        sqlx::query(&format!(
            "UPDATE {} SET manage_columns = $2, updated_at = NOW() WHERE id = $1",
            table
        ))
        .bind(actor.id())
        .bind(Json(prefs))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
