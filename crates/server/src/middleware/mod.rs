//! HTTP middleware stack for the graph endpoint.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (add unique ID to each request)
//!
//! Caller identity is not middleware: it is resolved per request by the
//! [`RequestContext`](crate::context::RequestContext) extractor.

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
