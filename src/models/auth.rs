// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{access::ModuleAccess, columns::ColumnPreference};

// Usuário interno (painel de risco)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    #[sqlx(json)]
    pub module_access: Vec<ModuleAccess>,
    #[sqlx(json)]
    #[serde(skip_serializing)]
    pub manage_columns: Vec<ColumnPreference>,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Contato de um cliente com acesso ao painel do cliente
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub crm_contact_id: Option<String>,
    pub has_portal_access: bool,
    #[sqlx(json)]
    pub module_access: Vec<ModuleAccess>,
    #[sqlx(json)]
    #[serde(skip_serializing)]
    pub manage_columns: Vec<ColumnPreference>,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorKind {
    User,
    ClientUser,
}

/// Quem está fazendo a requisição. Injetado pelo `auth_guard`.
#[derive(Debug, Clone)]
pub enum Actor {
    User(User),
    ClientUser(ClientUser),
}

impl Actor {
    pub fn id(&self) -> Uuid {
        match self {
            Actor::User(u) => u.id,
            Actor::ClientUser(cu) => cu.id,
        }
    }

    pub fn kind(&self) -> ActorKind {
        match self {
            Actor::User(_) => ActorKind::User,
            Actor::ClientUser(_) => ActorKind::ClientUser,
        }
    }

    /// O tenant ao qual o ator está preso (apenas usuários de cliente).
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            Actor::User(_) => None,
            Actor::ClientUser(cu) => Some(cu.client_id),
        }
    }

    pub fn module_access(&self) -> &[ModuleAccess] {
        match self {
            Actor::User(u) => &u.module_access,
            Actor::ClientUser(cu) => &cu.module_access,
        }
    }

    pub fn manage_columns(&self) -> &[ColumnPreference] {
        match self {
            Actor::User(u) => &u.manage_columns,
            Actor::ClientUser(cu) => &cu.manage_columns,
        }
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // Subject (ID do ator)
    pub kind: ActorKind, // Usuário interno ou usuário de cliente
    pub exp: usize,      // Expiration time
    pub iat: usize,      // Issued At
}
