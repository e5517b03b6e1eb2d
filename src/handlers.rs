pub mod applications;
pub mod claims;
pub mod clients;
pub mod columns;
pub mod dashboard;
pub mod maintenance;
pub mod notes;
pub mod search;
pub mod users;
