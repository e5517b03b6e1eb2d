// src/models/access.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Os módulos funcionais do sistema. Cada um tem um descritor estático
/// (ver `services::module_registry`), então adicionar um módulo é adicionar uma variante.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleName {
    User,
    Client,
    Debtor,
    Application,
    CreditLimit,
    Task,
    Insurer,
    Policy,
    Claim,
    Note,
    Dashboard,
    Settings,
}

impl ModuleName {
    pub const ALL: [ModuleName; 12] = [
        ModuleName::User,
        ModuleName::Client,
        ModuleName::Debtor,
        ModuleName::Application,
        ModuleName::CreditLimit,
        ModuleName::Task,
        ModuleName::Insurer,
        ModuleName::Policy,
        ModuleName::Claim,
        ModuleName::Note,
        ModuleName::Dashboard,
        ModuleName::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleName::User => "user",
            ModuleName::Client => "client",
            ModuleName::Debtor => "debtor",
            ModuleName::Application => "application",
            ModuleName::CreditLimit => "credit-limit",
            ModuleName::Task => "task",
            ModuleName::Insurer => "insurer",
            ModuleName::Policy => "policy",
            ModuleName::Claim => "claim",
            ModuleName::Note => "note",
            ModuleName::Dashboard => "dashboard",
            ModuleName::Settings => "settings",
        }
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleName::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("módulo desconhecido: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AccessType {
    Read,
    Write,
    FullAccess,
}

/// Entrada persistida em `module_access` (JSONB) de cada usuário.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAccess {
    pub name: String,
    #[serde(default)]
    pub access_types: Vec<AccessType>,
}

/// Nível de visibilidade resultante para um par (ator, módulo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessLevel {
    None,
    Own,
    Full,
}

/// Resposta de `GET /api/users/me/modules`, montada a cada requisição.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAccessView {
    pub name: ModuleName,
    pub label: &'static str,
    pub access_types: Vec<AccessType>,
    pub level: AccessLevel,
}
