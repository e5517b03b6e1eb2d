// src/models/columns.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::access::ModuleName;

// Uma coluna disponível no catálogo estático do módulo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColumnDef {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Catálogo de colunas de um módulo (dado de referência, somente leitura).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCatalog {
    pub name: ModuleName,
    pub manage_columns: Vec<ColumnDef>,
    pub default_columns: Vec<String>,
}

impl ModuleCatalog {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.manage_columns.iter().find(|c| c.name == name)
    }
}

/// Preferência persistida por ator: `manageColumns: [{moduleName, columns}]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPreference {
    pub module_name: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub default_fields: Vec<ColumnField>,
    pub custom_fields: Vec<ColumnField>,
}

/// Cabeçalho das listagens: as colunas selecionadas, na ordem do usuário.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ColumnHeader {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&ColumnDef> for ColumnHeader {
    fn from(def: &ColumnDef) -> Self {
        Self {
            name: def.name.clone(),
            label: def.label.clone(),
            kind: def.kind.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateColumnsPayload {
    #[serde(default)]
    #[validate(length(max = 100, message = "too_many_columns"))]
    pub columns: Vec<String>,

    #[serde(default)]
    pub is_reset: bool,
}
