pub mod access;
pub mod application;
pub mod audit;
pub mod auth;
pub mod client;
pub mod columns;
pub mod crm;
pub mod dashboard;
pub mod debtor;
pub mod insurer;
pub mod note;
pub mod policy;
pub mod search;
pub mod task;
