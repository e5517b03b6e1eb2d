// src/services/access_policy.rs

use crate::{
    models::{
        access::{AccessLevel, AccessType, ModuleAccessView, ModuleName},
        auth::Actor,
    },
    services::module_registry,
};

/// Resolve o nível de visibilidade de um ator num módulo.
///
/// - Usuário de cliente: sempre `Own` (preso ao próprio `client_id`).
/// - Usuário interno: sem entrada ou sem tipos de acesso => `None`;
///   com `full-access` => `Full`; qualquer outro tipo => `Own`.
pub fn resolve_access(actor: &Actor, module: ModuleName) -> AccessLevel {
    match actor {
        Actor::ClientUser(_) => AccessLevel::Own,
        Actor::User(_) => {
            let types = access_types(actor, module);
            if types.is_empty() {
                AccessLevel::None
            } else if types.contains(&AccessType::FullAccess) {
                AccessLevel::Full
            } else {
                AccessLevel::Own
            }
        }
    }
}

/// Variante por nome: módulo desconhecido é `None`, não erro.
pub fn resolve_access_by_name(actor: &Actor, module_name: &str) -> AccessLevel {
    module_name
        .parse::<ModuleName>()
        .map(|module| resolve_access(actor, module))
        .unwrap_or(AccessLevel::None)
}

/// Tipos de acesso "achatados" do ator para um módulo.
pub fn access_types(actor: &Actor, module: ModuleName) -> Vec<AccessType> {
    actor
        .module_access()
        .iter()
        .find(|entry| entry.name == module.as_str())
        .map(|entry| entry.access_types.clone())
        .unwrap_or_default()
}

pub fn can_write(actor: &Actor, module: ModuleName) -> bool {
    match actor {
        Actor::ClientUser(_) => true,
        Actor::User(_) => {
            let types = access_types(actor, module);
            types.contains(&AccessType::Write) || types.contains(&AccessType::FullAccess)
        }
    }
}

/// Visão dos módulos para o front. É montada do zero a cada chamada:
/// o catálogo estático nunca é decorado com dados do usuário.
pub fn module_views(actor: &Actor) -> Vec<ModuleAccessView> {
    ModuleName::ALL
        .into_iter()
        .map(|module| ModuleAccessView {
            name: module,
            label: module_registry::descriptor(module).label,
            access_types: access_types(actor, module),
            level: resolve_access(actor, module),
        })
        .collect()
}
