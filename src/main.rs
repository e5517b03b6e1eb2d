//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::middleware::auth::auth_guard;
use crate::services::housekeeping;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger: RUST_LOG ou "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if config.housekeeping_enabled {
        housekeeping::spawn(app_state.counter_store.clone());
        tracing::info!("🌙 Rotina diária de housekeeping agendada");
    }

    let app = router(app_state).merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()));

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(app_state: AppState) -> Router {
    let search_routes = Router::new()
        .route("/", get(handlers::search::global_search))
        .route("/{entity_type}", get(handlers::search::entity_search));

    let dashboard_routes = Router::new()
        .route("/{client_id}", get(handlers::dashboard::get_overview))
        .route("/{client_id}/{metric}", get(handlers::dashboard::get_metric));

    let column_routes = Router::new().route(
        "/{module}",
        get(handlers::columns::get_columns).put(handlers::columns::update_columns),
    );

    let client_routes = Router::new()
        .route("/", get(handlers::clients::list_clients))
        .route("/crm", get(handlers::clients::search_crm_clients))
        .route("/crm/{crm_client_id}", post(handlers::clients::add_client_from_crm));

    let claim_routes = Router::new()
        .route(
            "/",
            get(handlers::claims::list_claims).post(handlers::claims::create_claim),
        )
        .route(
            "/{crm_claim_id}/documents",
            post(handlers::claims::upload_claim_document),
        );

    let application_routes = Router::new().route(
        "/credit-limit-check",
        post(handlers::applications::check_credit_limit),
    );

    let note_routes = Router::new().route(
        "/{entity_type}/{entity_id}",
        get(handlers::notes::list_notes),
    );

    let user_routes = Router::new().route("/me/modules", get(handlers::users::my_modules));

    let maintenance_routes = Router::new()
        .route(
            "/credit-limits/dedupe",
            post(handlers::maintenance::remove_redundant_credit_limits),
        )
        .route(
            "/credit-limits/active-applications",
            post(handlers::maintenance::recompute_active_applications),
        );

    // Tudo abaixo de /api (exceto o health) passa pelo auth_guard
    let protected = Router::new()
        .nest("/search", search_routes)
        .nest("/dashboard", dashboard_routes)
        .nest("/columns", column_routes)
        .nest("/clients", client_routes)
        .nest("/claims", claim_routes)
        .nest("/applications", application_routes)
        .nest("/notes", note_routes)
        .nest("/users", user_routes)
        .nest("/maintenance", maintenance_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", protected)
        .with_state(app_state)
}
