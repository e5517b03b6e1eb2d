// src/models/note.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Quem escreveu a nota: define quem pode lê-la.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NoteAuthorType {
    User,
    ClientUser,
}

impl NoteAuthorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteAuthorType::User => "user",
            NoteAuthorType::ClientUser => "client-user",
        }
    }

    pub fn from_db(value: &str) -> Self {
        if value == "client-user" {
            NoteAuthorType::ClientUser
        } else {
            NoteAuthorType::User
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub client_id: Option<Uuid>,
    pub description: String,
    pub is_public: bool,
    pub created_by_type: String,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn author_type(&self) -> NoteAuthorType {
        NoteAuthorType::from_db(&self.created_by_type)
    }
}
