//! Remote graph endpoint client.
//!
//! Uses `graphql_client`'s `QueryBody` / `Response` envelopes with `reqwest`
//! for HTTP. Responses come back as raw JSON `data` so they can be normalized
//! into the session cache. Nothing here touches the cache: callers reserve a
//! [`FetchSeq`](crate::FetchSeq) before the fetch and absorb the data after.

pub mod operations;

use std::sync::Arc;

use async_trait::async_trait;
use graphql_client::{QueryBody, Response};
use launchpad_core::{Credential, Email, LaunchId};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use operations::Operation;

/// Errors that can occur when talking to the graph endpoint.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with GraphQL errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Rate limited by the endpoint.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The response had neither data nor errors, or lacked the expected field.
    #[error("No data in response for {0}")]
    MissingData(String),

    /// `login` returned no credential.
    #[error("Login rejected")]
    LoginRejected,

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

/// A GraphQL error returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    pub path: Vec<String>,
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(e: graphql_client::Error) -> Self {
        Self {
            message: e.message,
            path: e.path.map_or_else(Vec::new, |p| {
                p.into_iter()
                    .map(|fragment| match fragment {
                        graphql_client::PathFragment::Key(s) => s,
                        graphql_client::PathFragment::Index(i) => i.to_string(),
                    })
                    .collect()
            }),
        }
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();
            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }
            if !e.path.is_empty() {
                parts.push(format!("path: {}", e.path.join(".")));
            }
            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Carries one request body to the endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body`, attaching `credential` if present.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the exchange fails before a GraphQL
    /// response could be parsed.
    async fn send(
        &self,
        body: &QueryBody<Value>,
        credential: Option<&Credential>,
    ) -> Result<Response<Value>, RemoteError>;
}

/// `reqwest` transport posting JSON to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Build a transport for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        body: &QueryBody<Value>,
        credential: Option<&Credential>,
    ) -> Result<Response<Value>, RemoteError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(credential) = credential {
            request = request.header("Authorization", credential.expose());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(RemoteError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "graph endpoint returned non-success status"
            );
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: response_text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "failed to parse graph response"
            );
            RemoteError::Parse(e)
        })
    }
}

/// Result of `bookTrips` / `cancelTrip`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TripUpdate {
    pub success: bool,
    pub message: Option<String>,
    /// Affected launches as returned, ready to normalize.
    #[serde(default)]
    pub launches: Vec<Value>,
}

/// Client for the Launchpad graph endpoint.
///
/// Cheap to clone; clones share the transport.
pub struct LaunchClient<T = HttpTransport> {
    inner: Arc<T>,
}

impl<T> Clone for LaunchClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LaunchClient<HttpTransport> {
    /// Create a client posting to `config.endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: Transport> LaunchClient<T> {
    /// Create a client over any [`Transport`].
    pub fn with_transport(transport: T) -> Self {
        Self {
            inner: Arc::new(transport),
        }
    }

    /// Execute `operation` and return its `data`.
    ///
    /// Resolves to [`RemoteError::Cancelled`] as soon as `cancel` fires; the
    /// in-flight request is dropped. Nothing is sent if `cancel` has already
    /// fired.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] on transport failure, GraphQL errors,
    /// missing data or cancellation.
    #[instrument(skip(self, variables, credential, cancel), fields(operation = operation.name))]
    pub async fn fetch(
        &self,
        operation: &Operation,
        variables: Value,
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> Result<Value, RemoteError> {
        let body = QueryBody {
            variables,
            query: operation.document,
            operation_name: operation.name,
        };

        if cancel.is_cancelled() {
            debug!("request cancelled before sending");
            return Err(RemoteError::Cancelled);
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("request cancelled");
                return Err(RemoteError::Cancelled);
            }
            response = self.inner.send(&body, credential) => response?,
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");
            return Err(RemoteError::GraphQL(
                errors.into_iter().map(GraphQLError::from).collect(),
            ));
        }

        response
            .data
            .ok_or_else(|| RemoteError::MissingData(operation.name.to_string()))
    }

    /// A page of launches after `after` (the first page when `None`).
    ///
    /// # Errors
    ///
    /// See [`LaunchClient::fetch`].
    pub async fn launches(
        &self,
        after: Option<&str>,
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> Result<Value, RemoteError> {
        self.fetch(
            &operations::LAUNCH_LIST,
            json!({ "after": after }),
            credential,
            cancel,
        )
        .await
    }

    /// Details of one launch.
    ///
    /// # Errors
    ///
    /// See [`LaunchClient::fetch`].
    pub async fn launch(
        &self,
        id: &LaunchId,
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> Result<Value, RemoteError> {
        self.fetch(
            &operations::LAUNCH_DETAILS,
            json!({ "id": id.as_str() }),
            credential,
            cancel,
        )
        .await
    }

    /// The signed-in user and their trips. `me` is `null` without a valid
    /// credential.
    ///
    /// # Errors
    ///
    /// See [`LaunchClient::fetch`].
    pub async fn me(
        &self,
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> Result<Value, RemoteError> {
        self.fetch(&operations::GET_MY_TRIPS, json!({}), credential, cancel)
            .await
    }

    /// Exchange an email for a session credential.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::LoginRejected`] if the endpoint answers
    /// `login: null`, or any [`LaunchClient::fetch`] error.
    #[instrument(skip(self, email, cancel), fields(domain = %email.domain()))]
    pub async fn login(
        &self,
        email: &Email,
        cancel: &CancellationToken,
    ) -> Result<Credential, RemoteError> {
        let data = self
            .fetch(
                &operations::LOGIN,
                json!({ "email": email.as_str() }),
                None,
                cancel,
            )
            .await?;

        match data.get("login") {
            Some(Value::String(token)) if !token.is_empty() => Ok(Credential::new(token.clone())),
            Some(_) => Err(RemoteError::LoginRejected),
            None => Err(RemoteError::MissingData("login".to_string())),
        }
    }

    /// Book every launch in `ids`.
    ///
    /// # Errors
    ///
    /// See [`LaunchClient::fetch`].
    pub async fn book_trips(
        &self,
        ids: &[LaunchId],
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> Result<TripUpdate, RemoteError> {
        let ids: Vec<&str> = ids.iter().map(LaunchId::as_str).collect();
        let data = self
            .fetch(
                &operations::BOOK_TRIPS,
                json!({ "launchIds": ids }),
                credential,
                cancel,
            )
            .await?;
        trip_update(data, "bookTrips")
    }

    /// Cancel the booking for `id`.
    ///
    /// # Errors
    ///
    /// See [`LaunchClient::fetch`].
    pub async fn cancel_trip(
        &self,
        id: &LaunchId,
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> Result<TripUpdate, RemoteError> {
        let data = self
            .fetch(
                &operations::CANCEL_TRIP,
                json!({ "launchId": id.as_str() }),
                credential,
                cancel,
            )
            .await?;
        trip_update(data, "cancelTrip")
    }
}

fn trip_update(mut data: Value, field: &str) -> Result<TripUpdate, RemoteError> {
    let value = data
        .get_mut(field)
        .map(Value::take)
        .filter(|v| !v.is_null())
        .ok_or_else(|| RemoteError::MissingData(field.to_string()))?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Replays a canned response and records what was sent.
    struct Canned {
        response: Value,
        delay: Duration,
        sent: Mutex<Vec<(String, Value, Option<String>)>>,
    }

    impl Canned {
        fn new(response: Value) -> Self {
            Self {
                response,
                delay: Duration::ZERO,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(
            &self,
            body: &QueryBody<Value>,
            credential: Option<&Credential>,
        ) -> Result<Response<Value>, RemoteError> {
            self.sent.lock().unwrap().push((
                body.operation_name.to_string(),
                body.variables.clone(),
                credential.map(|c| c.expose().to_string()),
            ));
            tokio::time::sleep(self.delay).await;
            Ok(serde_json::from_value(self.response.clone())?)
        }
    }

    #[test]
    fn test_graphql_error_formatting() {
        let err = RemoteError::GraphQL(vec![
            GraphQLError {
                message: "Launch not found".to_string(),
                path: vec!["launch".to_string()],
            },
            GraphQLError {
                message: String::new(),
                path: vec![],
            },
        ]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Launch not found path: launch; [error 2]: (no details)"
        );
    }

    #[tokio::test]
    async fn test_fetch_returns_data_and_sends_credential() {
        let client = LaunchClient::with_transport(Canned::new(json!({ "data": { "me": null } })));
        let credential = Credential::new("dGVzdEBleGFtcGxlLmNvbQ==");

        let data = client
            .me(Some(&credential), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(data, json!({ "me": null }));
        let sent = client.inner.sent.lock().unwrap();
        assert_eq!(sent[0].0, "GetMyTrips");
        assert_eq!(sent[0].2.as_deref(), Some("dGVzdEBleGFtcGxlLmNvbQ=="));
    }

    #[tokio::test]
    async fn test_graphql_errors_surface() {
        let client = LaunchClient::with_transport(Canned::new(json!({
            "data": null,
            "errors": [{ "message": "boom", "path": ["launches", 0] }]
        })));

        let err = client
            .launches(None, None, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            RemoteError::GraphQL(errors) => {
                assert_eq!(errors[0].message, "boom");
                assert_eq!(errors[0].path, vec!["launches", "0"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_data() {
        let client = LaunchClient::with_transport(Canned::new(json!({})));
        assert!(matches!(
            client.launches(None, None, &CancellationToken::new()).await,
            Err(RemoteError::MissingData(op)) if op == "LaunchList"
        ));
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_slow_response() {
        let mut canned = Canned::new(json!({ "data": {} }));
        canned.delay = Duration::from_secs(30);
        let client = LaunchClient::with_transport(canned);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            client.launches(None, None, &cancel).await,
            Err(RemoteError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_token_sends_nothing() {
        // Answers on its first poll.
        let client = LaunchClient::with_transport(Canned::new(
            json!({ "data": { "login": "dGVzdEBleGFtcGxlLmNvbQ==" } }),
        ));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let email = Email::parse("test@example.com").unwrap();

        for _ in 0..20 {
            assert!(matches!(
                client.login(&email, &cancel).await,
                Err(RemoteError::Cancelled)
            ));
        }
        assert!(client.inner.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_returns_credential() {
        let client = LaunchClient::with_transport(Canned::new(
            json!({ "data": { "login": "dGVzdEBleGFtcGxlLmNvbQ==" } }),
        ));
        let email = Email::parse("test@example.com").unwrap();
        let credential = client.login(&email, &CancellationToken::new()).await.unwrap();
        assert_eq!(credential, Credential::new("dGVzdEBleGFtcGxlLmNvbQ=="));
    }

    #[tokio::test]
    async fn test_login_null_is_rejected() {
        let client =
            LaunchClient::with_transport(Canned::new(json!({ "data": { "login": null } })));
        let email = Email::parse("test@example.com").unwrap();
        assert!(matches!(
            client.login(&email, &CancellationToken::new()).await,
            Err(RemoteError::LoginRejected)
        ));
    }

    #[tokio::test]
    async fn test_book_trips_parses_update() {
        let client = LaunchClient::with_transport(Canned::new(json!({
            "data": {
                "bookTrips": {
                    "success": true,
                    "message": "trips booked successfully",
                    "launches": [{ "__typename": "Launch", "id": "1", "isBooked": true }]
                }
            }
        })));

        let update = client
            .book_trips(
                &[LaunchId::from("1")],
                Some(&Credential::new("abc")),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(update.success);
        assert_eq!(update.launches.len(), 1);
        assert_eq!(
            client.inner.sent.lock().unwrap()[0].1,
            json!({ "launchIds": ["1"] })
        );
    }
}
