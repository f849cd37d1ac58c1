pub mod auth;
pub mod client;
pub mod deal;
pub mod notification;
pub mod project;
