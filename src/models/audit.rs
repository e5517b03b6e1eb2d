// src/models/audit.rs

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Uma linha do "antes/depois" gravado pelas rotinas de correção de dados.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChange {
    pub record_id: Uuid,
    pub before: Value,
    pub after: Value,
}

/// Entrada de `audit_logs`: uma execução de rotina e todas as linhas que ela mexeu.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub entity_type: &'static str,
    pub action: &'static str,
    pub user_id: Option<Uuid>,
    pub changes: Vec<AuditChange>,
}

/// Resultado de uma rotina de correção.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemediationReport {
    pub action: &'static str,
    pub examined: usize,
    pub changed: usize,
}
