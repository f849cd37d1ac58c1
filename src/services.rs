pub mod auth;
pub mod client_service;
pub mod deal_service;
pub mod notification_service;
pub mod project_service;
