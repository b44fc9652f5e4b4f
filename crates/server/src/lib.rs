//! Launchpad server library.
//!
//! The graph endpoint as a library, so the router can be driven in-process
//! by tests. The `launchpad-server` binary only adds process concerns
//! (Sentry, the tracing subscriber, the listener and shutdown).
//!
//! # Request flow
//!
//! 1. [`routes::app`] receives `POST /graphql`.
//! 2. The [`context::RequestContext`] extractor resolves the caller from the
//!    `Authorization` header and builds fresh fetcher handles for it.
//! 3. [`resolvers::execute`] dispatches on `operationName`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod context;
pub mod datasources;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod pagination;
pub mod resolvers;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use context::RequestContext;
pub use routes::app;
pub use state::AppState;
