// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        ClientRepository, DashboardRepository, NoteRepository, PgModuleSearcher, PolicyRepository,
        RemediationRepository, ScopeRepository, UserRepository,
    },
    services::{
        claim_service::ClaimService,
        client_service::ClientService,
        column_service::ColumnService,
        credit_limit_service::CreditLimitService,
        crm_gateway::{CrmConfig, CrmGateway, HttpCrmGateway},
        dashboard_service::DashboardService,
        housekeeping::CounterStore,
        note_service::NoteService,
        remediation_service::RemediationService,
        scope_resolver::ScopeResolver,
        search_service::{ModuleSearcher, SearchService},
    },
};

/// Configuração lida do ambiente (e do `.env`, se houver).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub crm: CrmConfig,
    pub housekeeping_enabled: bool,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} deve ser definida", key))
}

fn optional<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} tem um valor inválido: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: optional("DB_MAX_CONNECTIONS", 5)?,
            crm: CrmConfig {
                base_url: required("CRM_BASE_URL")?,
                api_token: required("CRM_API_TOKEN")?,
                timeout_secs: optional("CRM_TIMEOUT_SECS", 10)?,
            },
            housekeeping_enabled: optional("HOUSEKEEPING_ENABLED", true)?,
        })
    }
}

// O estado compartilhado: repositórios e serviços montados uma vez na subida
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub user_repo: UserRepository,
    pub counter_store: Arc<dyn CounterStore>,
    pub search_service: SearchService,
    pub dashboard_service: DashboardService,
    pub column_service: ColumnService,
    pub client_service: ClientService,
    pub claim_service: ClaimService,
    pub credit_limit_service: CreditLimitService,
    pub note_service: NoteService,
    pub remediation_service: RemediationService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let crm: Arc<dyn CrmGateway> = Arc::new(HttpCrmGateway::new(config.crm.clone())?);

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let client_repo = Arc::new(ClientRepository::new(db_pool.clone()));
        let resolver = ScopeResolver::new(Arc::new(ScopeRepository::new(db_pool.clone())));

        let searchers: Vec<Arc<dyn ModuleSearcher>> = PgModuleSearcher::all(&db_pool)
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn ModuleSearcher>)
            .collect();

        Ok(Self {
            search_service: SearchService::new(resolver.clone(), searchers),
            dashboard_service: DashboardService::new(
                Arc::new(DashboardRepository::new(db_pool.clone())),
                resolver.clone(),
            ),
            column_service: ColumnService::new(Arc::new(user_repo.clone())),
            client_service: ClientService::new(client_repo.clone(), crm.clone(), resolver.clone()),
            claim_service: ClaimService::new(client_repo.clone(), crm, resolver.clone()),
            credit_limit_service: CreditLimitService::new(
                Arc::new(PolicyRepository::new(db_pool.clone())),
                resolver.clone(),
            ),
            note_service: NoteService::new(Arc::new(NoteRepository::new(db_pool.clone())), resolver),
            remediation_service: RemediationService::new(Arc::new(RemediationRepository::new(
                db_pool.clone(),
            ))),
            counter_store: client_repo,
            user_repo,
            jwt_secret: config.jwt_secret.clone(),
            db_pool,
        })
    }
}
