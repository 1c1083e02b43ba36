//! codex-lb-proxy: a multi-account reverse proxy in front of an
//! upstream OpenAI-compatible chat/responses API.

mod collector;
mod config;
mod error;
mod handlers;
mod harvest;
mod metrics;
mod middleware;
mod orchestrator;
mod sse_adapter;
mod state;
mod streaming;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting codex-lb-proxy");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(listen_addr = %config.listen_addr, upstream = %config.upstream_base_url, "configuration loaded");

    let state = AppState::build(&config).await.context("failed to initialize application state")?;
    let metrics_handle = metrics::install_recorder();
    let app = build_router(state, metrics_handle);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Assemble the full application router: the firewalled upstream-proxy
/// surface, the unfirewalled dashboard surface, and `/metrics`, under
/// the global request-id and metrics-recording middleware.
fn build_router(state: AppState, metrics_handle: metrics_exporter_prometheus::PrometheusHandle) -> Router {
    let proxy_routes = Router::new()
        .route("/backend-api/codex/responses", post(handlers::native_responses))
        .route(
            "/backend-api/codex/responses/compact",
            post(handlers::responses_compact),
        )
        .route("/v1/responses", post(handlers::legacy_responses))
        .route("/v1/responses/compact", post(handlers::responses_compact))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::list_models))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::firewall_check));

    let dashboard_routes = Router::new().route("/api/codex/usage", get(handlers::codex_usage));

    let metrics_route = Router::new().route(
        "/metrics",
        get(move || {
            let handle = metrics_handle.clone();
            async move { ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], handle.render()).into_response() }
        }),
    );

    Router::new()
        .merge(proxy_routes)
        .merge(dashboard_routes)
        .merge(metrics_route)
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(axum::middleware::from_fn(middleware::record_metrics))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    async fn test_state() -> AppState {
        let store = store::Store::in_memory().await.unwrap();
        let encryptor = crypto::TokenEncryptor::from_config_str(&"ab".repeat(32)).unwrap();
        let http = reqwest::Client::new();

        let balancer = balancer::Balancer::new(store.clone(), false);
        let auth_manager = auth_manager::AuthManager::new(
            store.clone(),
            crypto::TokenEncryptor::from_config_str(&"ab".repeat(32)).unwrap(),
            http.clone(),
            auth_manager::AuthManagerConfig {
                auth_base_url: "https://auth.example.invalid".to_string(),
                client_id: "test-client".to_string(),
                scope: "openid".to_string(),
                refresh_interval_days: 8,
                request_timeout: std::time::Duration::from_secs(5),
            },
        );
        let upstream = upstream_client::UpstreamClient::new(http, "https://upstream.example.invalid".to_string());
        let firewall = firewall::Firewall::new(
            store.allowlist.clone(),
            firewall::FirewallConfig {
                trust_proxy_headers: false,
                trusted_proxy_cidrs: Vec::new(),
            },
        );

        AppState {
            store,
            balancer: std::sync::Arc::new(balancer),
            auth_manager: std::sync::Arc::new(auth_manager),
            upstream: std::sync::Arc::new(upstream),
            firewall: std::sync::Arc::new(firewall),
            encryptor: std::sync::Arc::new(encryptor),
            safe_fetch: upstream_client::SafeFetchConfig::default(),
            orchestrator_max_account_attempts: 3,
            sticky_threads_enabled: false,
        }
    }

    #[tokio::test]
    async fn models_endpoint_lists_the_static_catalog() {
        let state = test_state().await;
        let app = build_router(state, metrics::install_recorder());

        let response = app
            .oneshot(Request::builder().uri("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["object"], "list");
        assert!(json["data"].as_array().unwrap().iter().any(|m| m["id"] == "gpt-5.1"));
    }

    #[tokio::test]
    async fn compact_responses_is_rejected_with_not_implemented() {
        let state = test_state().await;
        let app = build_router(state, metrics::install_recorder());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/responses/compact")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"model": "gpt-5", "input": "hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn dashboard_usage_route_is_not_firewalled() {
        let state = test_state().await;
        let app = build_router(state, metrics::install_recorder());

        let response = app
            .oneshot(Request::builder().uri("/api/codex/usage").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
