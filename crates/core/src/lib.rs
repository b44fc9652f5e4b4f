//! Launchpad Core - Shared types library.
//!
//! This crate provides the domain types used across all Launchpad components:
//! - `client` - Session cache in front of the remote graph endpoint
//! - `server` - Graph endpoint with per-request identity resolution
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows both sides of the
//! wire to agree on the same shapes.
//!
//! # Modules
//!
//! - [`types`] - Ids, emails, credentials, launches, users, and pages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
