pub mod access_policy;
pub mod claim_service;
pub mod client_service;
pub mod column_service;
pub mod credit_limit_service;
pub mod crm_gateway;
pub mod dashboard_service;
pub mod housekeeping;
pub mod module_registry;
pub mod name_match;
pub mod note_service;
pub mod remediation_service;
pub mod scope_resolver;
pub mod search_service;
