// src/services/column_service.rs
//
// Colunas configuráveis por ator e por módulo, sobre o catálogo estático.
// As funções livres são puras; o serviço só persiste a preferência.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        access::ModuleName,
        auth::Actor,
        columns::{
            ColumnField, ColumnHeader, ColumnPreference, ColumnsResponse, ModuleCatalog,
            UpdateColumnsPayload,
        },
    },
    services::module_registry,
};

/// Colunas sempre presentes numa linha projetada.
pub const ALWAYS_KEPT: [&str; 1] = ["_id"];

/// Colunas selecionadas: as guardadas pelo ator (na ordem dele, só as que existem
/// no catálogo) ou, sem preferência, as padrão do módulo.
pub fn selected_columns(prefs: &[ColumnPreference], catalog: &ModuleCatalog) -> Vec<String> {
    match prefs.iter().find(|p| p.module_name == catalog.name.as_str()) {
        Some(pref) => pref
            .columns
            .iter()
            .filter(|c| catalog.column(c).is_some())
            .cloned()
            .collect(),
        None => catalog.default_columns.clone(),
    }
}

/// `{defaultFields, customFields}`, cada campo marcado com `isChecked`.
pub fn resolve_columns(prefs: &[ColumnPreference], catalog: &ModuleCatalog) -> ColumnsResponse {
    let selected = selected_columns(prefs, catalog);
    let (default_fields, custom_fields): (Vec<ColumnField>, Vec<ColumnField>) = catalog
        .manage_columns
        .iter()
        .map(|def| ColumnField {
            name: def.name.clone(),
            label: def.label.clone(),
            kind: def.kind.clone(),
            is_checked: selected.contains(&def.name),
        })
        .partition(|field| catalog.default_columns.contains(&field.name));

    ColumnsResponse {
        default_fields,
        custom_fields,
    }
}

/// Nova lista de preferências depois de um update (ou reset) do módulo.
pub fn apply_update(
    prefs: &[ColumnPreference],
    catalog: &ModuleCatalog,
    payload: &UpdateColumnsPayload,
) -> Result<Vec<ColumnPreference>, AppError> {
    let columns = if payload.is_reset {
        catalog.default_columns.clone()
    } else {
        if let Some(unknown) = payload.columns.iter().find(|c| catalog.column(c).is_none()) {
            return Err(AppError::BadRequest(format!(
                "coluna '{}' não existe no módulo '{}'",
                unknown, catalog.name
            )));
        }
        let mut columns: Vec<String> = Vec::with_capacity(payload.columns.len());
        for column in &payload.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        columns
    };

    let mut updated: Vec<ColumnPreference> = prefs
        .iter()
        .filter(|p| p.module_name != catalog.name.as_str())
        .cloned()
        .collect();
    updated.push(ColumnPreference {
        module_name: catalog.name.as_str().to_string(),
        columns,
    });
    Ok(updated)
}

pub fn headers(selected: &[String], catalog: &ModuleCatalog) -> Vec<ColumnHeader> {
    selected
        .iter()
        .filter_map(|name| catalog.column(name))
        .map(ColumnHeader::from)
        .collect()
}

/// Mantém só `_id`, as chaves de junção e as colunas selecionadas.
pub fn project(rows: Vec<Value>, selected: &[String], join_keys: &[&str]) -> Vec<Value> {
    rows.into_iter()
        .map(|row| match row {
            Value::Object(fields) => {
                let projected: Map<String, Value> = fields
                    .into_iter()
                    .filter(|(key, _)| {
                        ALWAYS_KEPT.contains(&key.as_str())
                            || join_keys.contains(&key.as_str())
                            || selected.iter().any(|s| s == key)
                    })
                    .collect();
                Value::Object(projected)
            }
            other => other,
        })
        .collect()
}

/// Troca o id guardado numa coluna de referência pelo nome de exibição.
/// Id sem nome conhecido vira `null`.
pub fn map_reference(rows: &mut [Value], column: &str, names: &HashMap<Uuid, String>) {
    for row in rows.iter_mut() {
        let Some(slot) = row.get_mut(column) else {
            continue;
        };
        let name = slot
            .as_str()
            .and_then(|raw| raw.parse::<Uuid>().ok())
            .and_then(|id| names.get(&id));
        *slot = match name {
            Some(name) => Value::String(name.clone()),
            None => Value::Null,
        };
    }
}

/// Ids distintos presentes numa coluna de referência (para buscar os nomes de uma vez).
pub fn reference_ids(rows: &[Value], column: &str) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = rows
        .iter()
        .filter_map(|row| row.get(column)?.as_str()?.parse().ok())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

#[async_trait]
pub trait ColumnPreferenceStore: Send + Sync {
    async fn save_columns(&self, actor: &Actor, prefs: &[ColumnPreference]) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct ColumnService {
    store: Arc<dyn ColumnPreferenceStore>,
}

impl ColumnService {
    pub fn new(store: Arc<dyn ColumnPreferenceStore>) -> Self {
        Self { store }
    }

    pub fn catalog(module: ModuleName) -> Result<&'static ModuleCatalog, AppError> {
        module_registry::descriptor(module)
            .catalog()
            .ok_or_else(|| AppError::NotFound(format!("Catálogo de colunas de '{}'", module)))
    }

    pub fn get_columns(&self, actor: &Actor, module: ModuleName) -> Result<ColumnsResponse, AppError> {
        let catalog = Self::catalog(module)?;
        Ok(resolve_columns(actor.manage_columns(), catalog))
    }

    pub async fn update_columns(
        &self,
        actor: &Actor,
        module: ModuleName,
        payload: &UpdateColumnsPayload,
    ) -> Result<ColumnsResponse, AppError> {
        let catalog = Self::catalog(module)?;
        let prefs = apply_update(actor.manage_columns(), catalog, payload)?;
        self.store.save_columns(actor, &prefs).await?;

        tracing::info!(
            "Colunas de '{}' atualizadas para o ator {} (reset: {})",
            module,
            actor.id(),
            payload.is_reset
        );
        Ok(resolve_columns(&prefs, catalog))
    }
}
