pub mod auth;
pub mod clients;
pub mod deals;
pub mod notifications;
pub mod projects;
