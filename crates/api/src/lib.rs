pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me));

    let classroom_routes = Router::new()
        .route("/", get(routes::classroom::list))
        .route("/", post(routes::classroom::create))
        .route("/join", post(routes::classroom::join))
        .route("/{classroom_id}", get(routes::classroom::get))
        .route("/{classroom_id}", delete(routes::classroom::delete))
        .route("/{classroom_id}/leave", post(routes::classroom::leave))
        .route("/{classroom_id}/member", get(routes::classroom::members));

    let invite_routes = Router::new().route("/{code}", get(routes::invite::get_invite_info));

    let task_routes = Router::new()
        .route("/", get(routes::task::list))
        .route("/", post(routes::task::create))
        .route("/{task_id}", get(routes::task::get))
        .route("/{task_id}/document", get(routes::task::download_document))
        .route(
            "/{task_id}/completion/toggle",
            post(routes::task::toggle_completion),
        )
        .route("/{task_id}/submission", get(routes::submission::list))
        .route("/{task_id}/submission", post(routes::submission::submit))
        .route(
            "/{task_id}/submission/{submission_id}/document",
            get(routes::submission::download),
        );

    let notification_routes = Router::new()
        .route("/", get(routes::notification::list))
        .route("/check-due", post(routes::notification::check_due))
        .route("/{notification_id}/read", put(routes::notification::mark_read));

    let chat_routes = Router::new()
        .route("/teacher", get(routes::chat::teachers))
        .route("/conversation", get(routes::chat::list_conversations))
        .route("/conversation", post(routes::chat::open_conversation))
        .route(
            "/conversation/{conversation_id}/message",
            get(routes::chat::list_messages),
        )
        .route(
            "/conversation/{conversation_id}/message",
            post(routes::chat::send_message),
        );

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/classroom", classroom_routes)
        .nest("/invite", invite_routes)
        .nest("/task", task_routes)
        .route("/calendar", get(routes::calendar::list))
        .nest("/notification", notification_routes)
        .nest("/chat", chat_routes);

    let health = Router::new().route("/health", get(health_check));
    let body_limit = state.settings.storage.max_upload_bytes;

    Router::new()
        .nest("/api", api)
        .merge(health)
        .route("/files/{bucket}/{*path}", get(routes::files::public_file))
        .route("/ws", get(ws::handler::ws_upgrade))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin when none are configured, otherwise only the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ws_connections": state.ws_storage.connection_count(),
    }))
}
