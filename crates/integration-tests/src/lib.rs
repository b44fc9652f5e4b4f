//! Integration tests for Launchpad.
//!
//! Everything runs in-process: the server's axum router is driven directly
//! with `tower::ServiceExt::oneshot`, and the client talks to it through
//! [`RouterTransport`], so no port is bound.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p launchpad-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, header},
};
use graphql_client::{QueryBody, Response};
use launchpad_client::{RemoteError, Transport};
use launchpad_core::Credential;
use launchpad_server::datasources::{InMemoryUserStore, StaticLaunchCatalog};
use launchpad_server::{AppState, ServerConfig, app};
use serde_json::Value;
use tower::ServiceExt;

/// The full server router over the bundled catalog and an empty user store.
///
/// # Panics
///
/// Panics if the bundled catalog does not parse.
#[must_use]
pub fn test_app() -> Router {
    let catalog = StaticLaunchCatalog::bundled().expect("bundled catalog parses");
    app(AppState::new(
        ServerConfig::default(),
        Arc::new(catalog),
        Arc::new(InMemoryUserStore::new()),
    ))
}

/// Build a `POST /graphql` request.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn graphql_request(body: &Value, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(authorization) = authorization {
        builder = builder.header(header::AUTHORIZATION, authorization);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// Send one graph request to `router` and parse the JSON body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn post_graphql(router: &Router, body: &Value, authorization: Option<&str>) -> Value {
    let Ok(response) = router
        .clone()
        .oneshot(graphql_request(body, authorization))
        .await;
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// Client [`Transport`] that posts to an in-process router.
#[derive(Clone)]
pub struct RouterTransport {
    router: Router,
}

impl RouterTransport {
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Transport for RouterTransport {
    async fn send(
        &self,
        body: &QueryBody<Value>,
        credential: Option<&Credential>,
    ) -> Result<Response<Value>, RemoteError> {
        let body = serde_json::to_value(body)?;
        let request = graphql_request(&body, credential.map(Credential::expose));

        let Ok(response) = self.router.clone().oneshot(request).await;

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| RemoteError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}
