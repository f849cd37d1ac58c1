pub mod user_repo;
pub use user_repo::UserRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod deal_repo;
pub use deal_repo::DealRepository;
pub mod project_repo;
pub use project_repo::ProjectRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
