use std::net::SocketAddr;

use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::handlers;
use crate::rate_limit;
use crate::state::AppState;

/// Assemble the full router. Signup/login carry the strict auth admission
/// tier on top of the general API tier; everything under /api shares the
/// general tier.
pub fn build_app(state: AppState) -> Router {
    let public = handlers::public_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::auth_tier,
    ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(public)
        .merge(handlers::protected_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::api_tier,
        ));

    Router::new()
        .nest("/api", api)
        .fallback(unknown_route)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn unknown_route() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "3001".into())
    )
    .parse()?;

    tracing::info!("DAIO auth server listening on {}", addr);
    tracing::info!("health check: http://{}/api/health", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    // Record peer addresses so the rate limiter can key un-proxied clients.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
