//! # netnode-api — HTTP Service for the Distribution Network
//!
//! Exposes network nodes and their products over a JSON API backed by
//! in-memory stores, optionally written through to Postgres.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                        | Auth |
//! |-------------------------|-------------------------------|------|
//! | `/api/network-nodes/*`  | [`routes::network_nodes`]     | yes  |
//! | `/api/products/*`       | [`routes::products`]          | yes  |
//! | `/api/schema/`          | [`openapi`]                   | no   |
//! | `/health/*`, `/metrics` | this module                   | no   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod filters;
pub mod middleware;
pub mod openapi;
pub mod pagination;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, `/metrics` and the schema document are mounted outside the
/// auth middleware so they stay reachable without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        accounts: state.accounts.clone(),
        db_pool: state.db_pool.clone(),
    };
    let metrics = ApiMetrics::new();
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::network_nodes::router())
        .merge(routes::products::router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .route_layer(from_fn(auth::auth_middleware));

    // Route layers only, so unmatched paths fall through to a plain 404.
    if metrics_on {
        api = api
            .route_layer(from_fn(middleware::metrics::metrics_middleware))
            .route_layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(openapi::router());

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Domain gauges are refreshed from the stores before encoding.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics.observe_state(&state);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 200 "ready", or 503 when the configured database does
/// not answer.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "database health check failed");
            return AppError::ServiceUnavailable("database unreachable".into()).into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
