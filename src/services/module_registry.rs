// src/services/module_registry.rs
//
// Um registro tipado por módulo: rótulo, tipo de entidade (para o escopo),
// alvo de busca e catálogo de colunas. Adicionar um módulo = adicionar um braço aqui.

use std::sync::LazyLock;

use crate::{
    models::{access::ModuleName, columns::ModuleCatalog, search::SearchTarget},
    services::scope_resolver::EntityKind,
};

#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    pub module: ModuleName,
    pub label: &'static str,
    pub entity: Option<EntityKind>,
    pub search_targets: &'static [SearchTarget],
}

impl ModuleDescriptor {
    /// Catálogo de colunas (somente leitura), quando o módulo tem listagem configurável.
    pub fn catalog(&self) -> Option<&'static ModuleCatalog> {
        CATALOGS.iter().find(|c| c.name == self.module)
    }
}

// Carregado uma vez; nunca é alterado depois disso.
static CATALOGS: LazyLock<Vec<ModuleCatalog>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../static_data/module_columns.json")).unwrap_or_else(|e| {
        tracing::error!("🔥 Catálogo de colunas inválido: {}", e);
        Vec::new()
    })
});

pub fn descriptor(module: ModuleName) -> ModuleDescriptor {
    let (label, entity, search_targets): (_, _, &'static [SearchTarget]) = match module {
        ModuleName::User => ("Users", Some(EntityKind::User), &[SearchTarget::User]),
        ModuleName::Client => ("Clients", Some(EntityKind::Client), &[SearchTarget::Client]),
        // Diretores casam por nome, mas quem governa o acesso é o módulo de devedores
        ModuleName::Debtor => (
            "Debtors",
            Some(EntityKind::Debtor),
            &[SearchTarget::Debtor, SearchTarget::DebtorDirector],
        ),
        ModuleName::Application => (
            "Applications",
            Some(EntityKind::Application),
            &[SearchTarget::Application],
        ),
        ModuleName::CreditLimit => ("Credit Limits", Some(EntityKind::ClientDebtor), &[]),
        ModuleName::Task => ("Tasks", Some(EntityKind::Task), &[SearchTarget::Task]),
        ModuleName::Insurer => ("Insurers", Some(EntityKind::Insurer), &[SearchTarget::Insurer]),
        ModuleName::Policy => ("Policies", Some(EntityKind::Policy), &[]),
        ModuleName::Claim => ("Claims", Some(EntityKind::Claim), &[]),
        ModuleName::Note => ("Notes", Some(EntityKind::Note), &[]),
        ModuleName::Dashboard => ("Dashboard", None, &[]),
        ModuleName::Settings => ("Settings", None, &[]),
    };

    ModuleDescriptor {
        module,
        label,
        entity,
        search_targets,
    }
}

/// Módulo que governa o acesso a um alvo de busca.
pub fn module_of(target: SearchTarget) -> Option<ModuleName> {
    ModuleName::ALL
        .into_iter()
        .find(|module| descriptor(*module).search_targets.contains(&target))
}
