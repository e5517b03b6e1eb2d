pub mod user_repo;
pub use user_repo::UserRepository;
pub mod scope_repo;
pub use scope_repo::ScopeRepository;
pub mod search_repo;
pub use search_repo::PgModuleSearcher;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod policy_repo;
pub use policy_repo::PolicyRepository;
pub mod note_repo;
pub use note_repo::NoteRepository;
pub mod remediation_repo;
pub use remediation_repo::RemediationRepository;
