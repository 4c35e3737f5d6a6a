//! HTTP server - router construction and startup

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::api::{admin_api, chat_api, document_api, info_api, memory_api, profile_api, session_api};
use crate::api::document_api::MAX_DOCUMENT_BYTES;
use crate::config::Config;
use crate::metrics;
use crate::shared_state::AppState;

/// Headroom over the document limit for JSON escaping and the other fields.
const BODY_LIMIT_BYTES: usize = MAX_DOCUMENT_BYTES * 2;

pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    metrics::init_metrics();
    cfg.print_config();

    let addr = cfg.api_addr()?;
    let state = AppState::from_config(cfg);
    let app = build_router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    Router::new()
        .route("/api/chat", post(chat_api::chat))
        .route(
            "/api/sessions",
            get(session_api::list_sessions).post(session_api::create_session),
        )
        .route("/api/sessions/:id/messages", get(session_api::list_session_messages))
        .route("/api/route", get(info_api::route_info))
        .route(
            "/api/profile",
            get(profile_api::get_profile).put(profile_api::update_profile),
        )
        .route("/api/onboarding", post(profile_api::onboarding))
        .route(
            "/api/memories",
            get(memory_api::list_memories).post(memory_api::create_memory),
        )
        .route("/api/memories/:id", axum::routing::delete(memory_api::delete_memory))
        .route(
            "/api/documents",
            get(document_api::list_documents)
                .post(document_api::upload_document)
                .delete(document_api::delete_document),
        )
        .route("/api/admin/stats", get(admin_api::stats))
        .route("/api/admin/users", get(admin_api::users))
        .route("/metrics", get(metrics::get_metrics))
        .route("/healthz", get(|| async { "OK" }))
        .layer(middleware::from_fn(track_requests))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

/// Count every response by matched route and status.
async fn track_requests(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    metrics::inc_request(&route, response.status());
    response
}
