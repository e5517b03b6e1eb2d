pub mod auth;
pub mod module_access;
