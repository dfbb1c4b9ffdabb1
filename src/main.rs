mod api;
mod auth;
mod forms;
mod model;
mod query;
mod settings;
mod store;

use auth::{AppState, SharedState};
use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use settings::Settings;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use store::Store;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
};
use tracing_subscriber::EnvFilter;

const STATIC_DIR: &str = "static";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env().unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        std::process::exit(1);
    });

    // ── Open the store ─────────────────────────────────────────
    // Table creation on open is the migration step. Fatal: the server
    // must not start taking traffic over a broken database.
    let store = Store::open(&settings.database_url)
        .expect("Failed to open database");

    if store
        .ensure_default_user(auth::hash_password("admin"))
        .expect("Failed to seed default user")
    {
        tracing::info!("created default admin user (admin / admin)");
    }

    // Static assets are best-effort: log and keep serving the API.
    if !Path::new(STATIC_DIR).is_dir() {
        tracing::warn!(dir = STATIC_DIR, "static directory missing, serving API only");
    }

    // ── Shared state ───────────────────────────────────────────
    let port = settings.port;
    let cors = cors_layer(&settings);
    let state: SharedState = Arc::new(AppState { store, settings });

    // ── Router ─────────────────────────────────────────────────
    let task_routes = Router::new()
        .route("/api/tasks", get(api::list_tasks).post(api::create_task))
        .route(
            "/api/tasks/:id",
            get(api::get_task)
                .put(api::update_task)
                .delete(api::delete_task),
        )
        .route("/api/tasks/:id/toggle", post(api::toggle_task))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let app = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        .merge(task_routes)
        .fallback_service(ServeDir::new(STATIC_DIR).append_index_html_on_directories(true))
        .with_state(state)
        .layer(cors);

    // ── Start ──────────────────────────────────────────────────
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}

/// DEBUG opens CORS wide; otherwise only the configured origins.
fn cors_layer(settings: &Settings) -> CorsLayer {
    if settings.debug {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_hosts
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
