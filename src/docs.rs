// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Search ---
        handlers::search::global_search,
        handlers::search::entity_search,

        // --- Dashboard ---
        handlers::dashboard::get_overview,
        handlers::dashboard::get_metric,

        // --- Columns ---
        handlers::columns::get_columns,
        handlers::columns::update_columns,

        // --- Clients ---
        handlers::clients::list_clients,
        handlers::clients::search_crm_clients,
        handlers::clients::add_client_from_crm,

        // --- Claims ---
        handlers::claims::list_claims,
        handlers::claims::create_claim,
        handlers::claims::upload_claim_document,

        // --- Applications ---
        handlers::applications::check_credit_limit,

        // --- Notes ---
        handlers::notes::list_notes,

        // --- Users ---
        handlers::users::my_modules,

        // --- Maintenance ---
        handlers::maintenance::remove_redundant_credit_limits,
        handlers::maintenance::recompute_active_applications,
    ),
    components(
        schemas(
            // --- Access ---
            models::access::ModuleName,
            models::access::AccessType,
            models::access::AccessLevel,
            models::access::ModuleAccessView,

            // --- Search ---
            models::search::ResultEnvelope,
            models::search::SubModule,

            // --- Dashboard ---
            models::dashboard::DashboardOverview,
            models::dashboard::CountOfTotal,
            models::dashboard::StatusHistogram,
            models::dashboard::ApprovedAmount,
            models::dashboard::DecisionBreakdown,

            // --- Columns ---
            models::columns::ColumnField,
            models::columns::ColumnHeader,
            models::columns::ColumnsResponse,
            models::columns::UpdateColumnsPayload,

            // --- Clients / CRM ---
            models::client::Client,
            models::crm::CrmAccount,
            models::crm::CrmClaim,
            models::crm::ClaimView,
            models::crm::CreateClaimPayload,
            models::crm::AddClientFromCrmPayload,
            models::crm::ClientSyncSummary,

            // --- Applications / Policies ---
            models::application::ApplicationStatus,
            models::policy::CreditLimitCheckPayload,
            models::policy::EndorsementCheck,

            // --- Notes ---
            models::note::Note,

            // --- Maintenance ---
            models::audit::RemediationReport,
        )
    ),
    tags(
        (name = "Search", description = "Busca global e typeahead por entidade"),
        (name = "Dashboard", description = "Indicadores da carteira de um cliente"),
        (name = "Columns", description = "Colunas visíveis por módulo"),
        (name = "Clients", description = "Clientes e importação do CRM"),
        (name = "Claims", description = "Sinistros (mantidos no CRM)"),
        (name = "Applications", description = "Pedidos de limite de crédito"),
        (name = "Notes", description = "Notas por entidade"),
        (name = "Users", description = "Dados do usuário e acessos"),
        (name = "Maintenance", description = "Rotinas de correção de dados")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
