use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::CurrentUser, state::AppState};

pub mod auth;
pub mod cases;
pub mod clients;
pub mod documents;
pub mod folders;
pub mod health;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let cases_routes = Router::new()
        .route("/", get(cases::list_cases).post(cases::create_case))
        .route(
            "/:id",
            get(cases::get_case)
                .patch(cases::update_case)
                .delete(cases::delete_case),
        );

    let clients_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/:id",
            get(clients::get_client)
                .patch(clients::update_client)
                .delete(clients::delete_client),
        );

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route("/browse", get(documents::browse))
        .route("/:id", axum::routing::delete(documents::delete_document))
        .route("/:id/download", get(documents::download_document));

    let folders_routes = Router::new().route("/", post(folders::create_folder));

    let users_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/:id/access", patch(users::update_access));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/cases", cases_routes)
        .nest("/api/clients", clients_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/folders", folders_routes)
        .nest("/api/users", users_routes)
        .layer(middleware::from_extractor_with_state::<CurrentUser, _>(
            protected_state,
        ));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 512))
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

/// Ceiling division with a floor of one page, so an empty listing still
/// reports page 1 of 1.
pub(crate) fn total_pages(total: i64, limit: i64) -> i64 {
    ((total + limit - 1) / limit).max(1)
}
