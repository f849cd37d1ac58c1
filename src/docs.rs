// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::list_users,

        // --- Clients ---
        handlers::clients::create_client,
        handlers::clients::list_clients,
        handlers::clients::client_details,
        handlers::clients::update_client,
        handlers::clients::delete_client,

        // --- Deals ---
        handlers::deals::create_deal,
        handlers::deals::list_deals,
        handlers::deals::get_deal,
        handlers::deals::submit_deal,
        handlers::deals::verify_deal,
        handlers::deals::update_deal,
        handlers::deals::delete_deal,

        // --- Projects ---
        handlers::projects::create_project,
        handlers::projects::list_projects,
        handlers::projects::update_project_status,
        handlers::projects::upload_project_files,
        handlers::projects::list_project_files,
        handlers::projects::delete_project_file,

        // --- Notifications ---
        handlers::notifications::list_notifications,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Clients ---
            models::client::Client,
            models::client::ClientFields,
            models::client::CreateClientPayload,
            models::client::UpdateClientPayload,
            models::client::OwnerPayload,

            // --- Deals ---
            models::deal::DealStatus,
            models::deal::Deal,
            models::deal::DealDetail,
            handlers::deals::SubmitDealPayload,
            handlers::deals::VerifyDealPayload,
            handlers::deals::DeleteDealPayload,
            handlers::deals::CreateDealForm,
            handlers::deals::UpdateDealForm,

            // --- Projects ---
            models::project::ProjectStatus,
            models::project::Project,
            models::project::ProjectListItem,
            models::project::ProjectFile,
            models::project::ProjectDraft,
            models::project::UpdateProjectStatusPayload,
            handlers::projects::CreateProjectForm,
            handlers::projects::UploadProjectFilesForm,
            handlers::projects::DeleteFilePayload,

            // --- Notifications ---
            models::notification::NotificationKind,
            models::notification::Notification,
        )
    ),
    tags(
        (name = "Auth", description = "Registro, login e usuários"),
        (name = "Clients", description = "Clientes de cada vendedor"),
        (name = "Deals", description = "Deals e fluxo de verificação"),
        (name = "Projects", description = "Projetos dos deals e seus arquivos"),
        (name = "Notifications", description = "Caixa de entrada por usuário")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/register",
            "/api/clients/details/{id}",
            "/api/deals/{id}/verify",
            "/api/projects/files/{id}/delete",
            "/api/notifications",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} ausente");
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("api_jwt")));
    }
}
