//! HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! POST /graphql   - Execute one operation (JSON envelope)
//! GET  /health    - Liveness check
//! ```

use std::time::Duration;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::{Request, Response},
    middleware,
    routing::{get, post},
};
use graphql_client::Response as GraphResponse;
use serde_json::Value;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::context::RequestContext;
use crate::error::{AppError, Result};
use crate::middleware::request_id_middleware;
use crate::resolvers::{self, GraphRequest};
use crate::state::AppState;

/// Build the full application: routes, tracing, request ids and Sentry.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/graphql", post(graphql))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Execute one graph request as the caller identified by its credential.
///
/// A body that is not a JSON request envelope is answered with 400.
async fn graphql(
    ctx: RequestContext,
    payload: std::result::Result<Json<GraphRequest>, JsonRejection>,
) -> Result<Json<GraphResponse<Value>>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let response = resolvers::execute(&ctx, &request).await?;
    Ok(Json(response))
}
