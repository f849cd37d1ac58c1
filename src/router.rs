// src/router.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

// Recibos e arquivos de projeto passam do limite padrão de 2 MB do axum
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(app_state: AppState) -> Router {
    // Rotas de autenticação; só /me exige token
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .merge(
            Router::new()
                .route("/me", get(handlers::auth::get_me))
                .layer(axum_middleware::from_fn_with_state(
                    app_state.clone(),
                    auth_guard,
                )),
        );

    let client_routes = Router::new()
        .route("/create", post(handlers::clients::create_client))
        .route("/list", get(handlers::clients::list_clients))
        .route("/details/{id}", get(handlers::clients::client_details))
        .route("/update/{id}", post(handlers::clients::update_client))
        .route("/delete/{id}", post(handlers::clients::delete_client));

    let deal_routes = Router::new()
        .route("/create", post(handlers::deals::create_deal))
        .route("/{id}", get(handlers::deals::get_deal))
        .route("/{id}/submit", post(handlers::deals::submit_deal))
        .route("/{id}/verify", post(handlers::deals::verify_deal))
        .route("/{id}/update", post(handlers::deals::update_deal))
        .route("/{id}/delete", post(handlers::deals::delete_deal));

    let project_routes = Router::new()
        .route("/create", post(handlers::projects::create_project))
        .route("/{id}/update-status", post(handlers::projects::update_project_status))
        .route("/files", get(handlers::projects::list_project_files))
        .route("/files/upload", post(handlers::projects::upload_project_files))
        .route("/files/{id}/delete", post(handlers::projects::delete_project_file));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/users", get(handlers::auth::list_users))
        .route("/api/deals", get(handlers::deals::list_deals))
        .route("/api/projects", get(handlers::projects::list_projects))
        .route("/api/notifications", get(handlers::notifications::list_notifications))
        .nest("/api/auth", auth_routes)
        .nest("/api/clients", client_routes)
        .nest("/api/deals", deal_routes)
        .nest("/api/projects", project_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::{
        config::Config,
        models::deal::DealStatus,
        services::deal_service::tests::{insert_deal, test_state},
    };

    // Pool preguiçoso: as requisições abaixo falham antes de tocar no banco
    fn test_router() -> Router {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let (state, _outbox_rx) = AppState::build(config, pool);
        build_router(state)
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = test_router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_responds_ok() {
        let response = test_router()
            .oneshot(get_request("/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let (status, json) = send(get_request("/api/auth/me")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid or missing authentication token");
    }

    #[tokio::test]
    async fn malformed_deal_id_uses_error_envelope() {
        let (status, json) = send(get_request("/api/deals/not-a-uuid")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn reject_without_reason_fails_before_lookup() {
        let uri = format!("/api/deals/{}/verify", uuid::Uuid::new_v4());
        let (status, json) = send(json_request(
            &uri,
            r#"{"action": "reject", "verifier": "vera", "reason": ""}"#,
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Rejection reason is required");
    }

    #[tokio::test]
    async fn verify_requires_action_and_verifier() {
        let uri = format!("/api/deals/{}/verify", uuid::Uuid::new_v4());
        let (status, json) = send(json_request(&uri, r#"{"action": "approve"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing required fields: action, verifier");
    }

    #[tokio::test]
    async fn deal_listing_requires_username_and_role() {
        let (status, json) = send(get_request("/api/deals?username=ana")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username and role are required");
    }

    #[tokio::test]
    async fn project_listing_requires_a_filter() {
        let (status, json) = send(get_request("/api/projects")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing filter parameter: deal_id or supervisor");
    }

    #[tokio::test]
    async fn notifications_require_recipient() {
        let (status, json) = send(get_request("/api/notifications")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Recipient is required");
    }

    #[tokio::test]
    async fn deal_create_reports_missing_form_fields() {
        let body = "--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\r\n\
Website revamp\r\n\
--XBOUNDARY--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/api/deals/create")
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let (status, json) = send(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Missing required fields: client_name"));
    }

    #[tokio::test]
    async fn invalid_json_body_uses_error_envelope() {
        let (status, json) = send(json_request("/api/clients/create", "{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    fn update_form(deal_id: uuid::Uuid, username: &str, budget: &str) -> Request<Body> {
        let body = format!(
            "--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"username\"\r\n\r\n\
{username}\r\n\
--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"budget\"\r\n\r\n\
{budget}\r\n\
--XBOUNDARY--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri(format!("/api/deals/{deal_id}/update"))
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_checks_ownership_before_fields(pool: sqlx::PgPool) {
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Draft).await;
        let verified = insert_deal(&pool, "Mobile app", DealStatus::Verified).await;
        let (state, _rx) = test_state(pool);
        let app = build_router(state);

        let response = app.clone().oneshot(update_form(deal.id, "bob", "abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Unauthorized: You can only update your own deals");

        let response = app.clone().oneshot(update_form(verified.id, "ana", "abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // O dono com status editável chega à validação dos campos
        let response = app.oneshot(update_form(deal.id, "ana", "abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Invalid budget amount");
    }
}
