use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, config::AppConfig, error, state::AppState, tasks};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let config = state.config.clone();

    Router::new()
        .nest(
            "/api",
            Router::new().merge(auth::router()).merge(tasks::router()),
        )
        .route("/", get(banner))
        .route("/health", get(|| async { Json(json!({ "success": true, "status": "ok" })) }))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::map_response(method_not_allowed_as_not_found))
        .layer(middleware::map_response_with_state(
            config,
            error::attach_error_detail,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        let ms = latency.as_millis();
                        if status.is_server_error() {
                            tracing::error!(%status, ms, "response");
                        } else {
                            tracing::info!(%status, ms, "response");
                        }
                    },
                ),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let Some(origin) = config
        .frontend_url
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
    else {
        return CorsLayer::permissive();
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn banner() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Task Manager API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": { "auth": "/api/auth", "tasks": "/api/tasks" },
    }))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}

// Unrouted methods on known paths get the same answer as unknown paths.
async fn method_not_allowed_as_not_found(resp: Response) -> Response {
    if resp.status() == StatusCode::METHOD_NOT_ALLOWED {
        return not_found().await.into_response();
    }
    resp
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
