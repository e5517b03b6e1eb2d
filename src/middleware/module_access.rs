// src/middleware/module_access.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::{ApiError, AppError},
    models::{
        access::{AccessLevel, ModuleName},
        auth::Actor,
    },
    services::access_policy,
};

/// 1. O Trait que marca um módulo no nível de tipo
pub trait ModuleDef: Send + Sync + 'static {
    const MODULE: ModuleName;
}

/// 2. O Extractor (Guardião): rejeita com 403 quem não tem acesso ao módulo
pub struct RequireModule<M: ModuleDef> {
    pub actor: Actor,
    _module: PhantomData<M>,
}

impl<M: ModuleDef> RequireModule<M> {
    /// Valida o ator sem passar pela requisição. O nível fino (FULL/OWN) é
    /// resolvido de novo pelos serviços, junto com o escopo.
    pub fn check(actor: Actor) -> Result<Self, AppError> {
        if access_policy::resolve_access(&actor, M::MODULE) == AccessLevel::None {
            return Err(AppError::ModuleAccessDenied(M::MODULE.to_string()));
        }
        Ok(Self {
            actor,
            _module: PhantomData,
        })
    }
}

// 3. Implementação do FromRequestParts (depende do `auth_guard` ter rodado antes)
impl<M, S> FromRequestParts<S> for RequireModule<M>
where
    M: ModuleDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or(AppError::InvalidToken)?;

        Ok(Self::check(actor)?)
    }
}

// ---
// DEFINIÇÃO DOS MÓDULOS (TIPOS)
// ---

pub struct DashboardModule;
impl ModuleDef for DashboardModule {
    const MODULE: ModuleName = ModuleName::Dashboard;
}

pub struct ClientModule;
impl ModuleDef for ClientModule {
    const MODULE: ModuleName = ModuleName::Client;
}

pub struct ClaimModule;
impl ModuleDef for ClaimModule {
    const MODULE: ModuleName = ModuleName::Claim;
}

pub struct ApplicationModule;
impl ModuleDef for ApplicationModule {
    const MODULE: ModuleName = ModuleName::Application;
}

pub struct NoteModule;
impl ModuleDef for NoteModule {
    const MODULE: ModuleName = ModuleName::Note;
}

pub struct SettingsModule;
impl ModuleDef for SettingsModule {
    const MODULE: ModuleName = ModuleName::Settings;
}
