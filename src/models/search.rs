// src/models/search.rs

use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{common::response::Paginated, models::access::ModuleName};

/// Onde, dentro do registro pai, o resultado foi encontrado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubModule {
    Contacts,
    Stakeholder,
}

/// Envelope uniforme da busca global: `{_id, title, module, hasSubModule, subModule?}`
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub module: ModuleName,
    pub has_sub_module: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_module: Option<SubModule>,
}

impl ResultEnvelope {
    pub fn top_level(id: Uuid, title: impl Into<String>, module: ModuleName) -> Self {
        Self {
            id,
            title: title.into(),
            module,
            has_sub_module: false,
            sub_module: None,
        }
    }

    /// Resultado de sub-entidade: o `_id` aponta para o registro PAI,
    /// para que a navegação sempre caia num registro de topo.
    pub fn nested(parent_id: Uuid, title: impl Into<String>, module: ModuleName, sub: SubModule) -> Self {
        Self {
            id: parent_id,
            title: title.into(),
            module,
            has_sub_module: true,
            sub_module: Some(sub),
        }
    }
}

/// Alvos da busca. A ordem de `ALL` é a ordem de concatenação da busca global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchTarget {
    User,
    Client,
    Insurer,
    Debtor,
    DebtorDirector,
    Task,
    Application,
}

impl SearchTarget {
    pub const ALL: [SearchTarget; 7] = [
        SearchTarget::User,
        SearchTarget::Client,
        SearchTarget::Insurer,
        SearchTarget::Debtor,
        SearchTarget::DebtorDirector,
        SearchTarget::Task,
        SearchTarget::Application,
    ];

    /// Módulo cujo acesso governa este alvo.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTarget::User => "user",
            SearchTarget::Client => "client",
            SearchTarget::Insurer => "insurer",
            SearchTarget::Debtor => "debtor",
            SearchTarget::DebtorDirector => "debtor-director",
            SearchTarget::Task => "task",
            SearchTarget::Application => "application",
        }
    }
}

impl FromStr for SearchTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("tipo de entidade desconhecido: {}", s))
    }
}

/// Forma reduzida para os pickers (typeahead): `_id` + campos de identificação crus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOption {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EntityOption {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// Resultado da busca por tipo de entidade: com texto, os matches;
/// sem texto, a listagem paginada já filtrada pelo escopo.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EntitySearchResult {
    Matches(Vec<EntityOption>),
    Listing(Paginated<EntityOption>),
}
