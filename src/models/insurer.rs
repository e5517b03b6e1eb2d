// src/models/insurer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Seguradora: mesma forma do Client, mas visível globalmente
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Insurer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub crm_insurer_id: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsurerUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub insurer_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub crm_contact_id: Option<String>,
}
